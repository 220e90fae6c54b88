//! Corpus Core - the searchable regulatory corpus
//!
//! This crate provides:
//! - Source declarations and text normalization (HTML, PDF, plain text)
//! - Sliding-window chunking
//! - Embedder and reranker collaborators with deterministic defaults
//! - Vector index (in memory or persisted as a JSON snapshot)
//! - Ingestion pipeline with per-source isolation
//! - Retriever with reranking and minimum-score gating
//! - Configuration management

pub mod chunk;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod ingest;
pub mod normalize;
pub mod rerank;
pub mod search;
pub mod source;
pub mod storage;

#[cfg(feature = "fastembed")]
pub mod bge;

// Re-export commonly used types
pub use chunk::{Chunk, Chunker, FixedSizeChunker};
pub use config::{ChunkingConfig, CorpusConfig, IndexConfig, RagConfig, INDEX_PATH_ENV};
pub use embeddings::{Embedder, Embedding, HashingEmbedder};
pub use error::{CorpusError, Result};
pub use ingest::{
    Fetcher, HttpFetcher, IngestionPipeline, IngestionSummary, InlineDocument, SkippedSource,
};
pub use rerank::{LexicalReranker, Reranker};
pub use search::{Query, RetrievalResult, RetrievedPassage, Retriever, ScoreGate};
pub use source::{ContentType, Source};
pub use storage::{
    open_index, IndexStats, MemoryIndex, PersistentIndex, SearchFilter, UpsertOutcome,
    VectorIndex, VectorRecord,
};

#[cfg(feature = "fastembed")]
pub use bge::{BgeEmbedder, BgeReranker};
