//! Error types for the regulatory corpus

use thiserror::Error;

/// Result type alias for corpus operations
pub type Result<T> = std::result::Result<T, CorpusError>;

/// Errors that can occur while building or querying the corpus
#[derive(Error, Debug)]
pub enum CorpusError {
    /// Source unreachable or returned a non-success status
    #[error("fetch error for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Invalid chunking, retrieval or index parameters
    #[error("configuration error: {0}")]
    Config(String),

    /// Failed to load or run the embedding model
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Failed to score candidates with the reranker
    #[error("reranking error: {0}")]
    Rerank(String),

    /// Failed to read, write or query the vector index
    #[error("storage error: {0}")]
    Storage(String),

    /// A retriever call exceeded its time budget
    #[error("retrieval timed out after {timeout_ms}ms for query '{query}'")]
    RetrievalTimeout { query: String, timeout_ms: u64 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CorpusError {
    pub fn config(message: impl Into<String>) -> Self {
        CorpusError::Config(message.into())
    }

    pub fn fetch(url: &str, reason: impl std::fmt::Display) -> Self {
        CorpusError::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error should degrade to an empty retrieval result
    pub fn is_timeout(&self) -> bool {
        matches!(self, CorpusError::RetrievalTimeout { .. })
    }
}
