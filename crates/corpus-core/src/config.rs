//! Configuration for the regulatory corpus
//!
//! Retrieval, chunking and index settings are plain values threaded through the
//! pipeline and retriever, so analyses with different tuning can coexist.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CorpusError, Result};
use crate::source::Source;

/// Environment variable that overrides `[index] path`
pub const INDEX_PATH_ENV: &str = "REGCHECK_INDEX_PATH";

/// Retrieval parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagConfig {
    /// Candidates pulled from the vector index before reranking
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Passages kept after reranking
    #[serde(default = "default_rerank_k")]
    pub rerank_k: usize,
    /// Minimum rerank score; anything below is dropped
    #[serde(default = "default_min_score")]
    pub min_score: f32,
    /// Budget for a single retriever call
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Retriever calls allowed in flight at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_top_k() -> usize {
    8
}

fn default_rerank_k() -> usize {
    6
}

fn default_min_score() -> f32 {
    0.35
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_max_concurrency() -> usize {
    4
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            rerank_k: default_rerank_k(),
            min_score: default_min_score(),
            timeout_ms: default_timeout_ms(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl RagConfig {
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(CorpusError::config("rag.top_k must be greater than 0"));
        }
        if self.rerank_k == 0 {
            return Err(CorpusError::config("rag.rerank_k must be greater than 0"));
        }
        if !self.min_score.is_finite() {
            return Err(CorpusError::config("rag.min_score must be a finite number"));
        }
        if self.timeout_ms == 0 {
            return Err(CorpusError::config("rag.timeout_ms must be greater than 0"));
        }
        if self.max_concurrency == 0 {
            return Err(CorpusError::config("rag.max_concurrency must be greater than 0"));
        }
        Ok(())
    }
}

/// Sliding window parameters, measured in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    120
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(CorpusError::config("chunking.chunk_size must be greater than 0"));
        }
        if self.chunk_overlap == 0 {
            return Err(CorpusError::config("chunking.chunk_overlap must be greater than 0"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(CorpusError::config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Vector index location and shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Snapshot file; the index lives in memory only when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Embedding dimension D
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

fn default_dimension() -> usize {
    384
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: None,
            dimension: default_dimension(),
        }
    }
}

impl IndexConfig {
    /// Create a configuration for an on-disk index
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }
}

/// Complete corpus configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CorpusConfig {
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub sources: Vec<Source>,
}

impl CorpusConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| CorpusError::config(format!("invalid corpus configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.rag.validate()?;
        self.chunking.validate()?;
        if self.index.dimension == 0 {
            return Err(CorpusError::config("index.dimension must be greater than 0"));
        }
        Ok(())
    }

    /// Apply environment overrides
    ///
    /// Expected variables:
    /// - REGCHECK_INDEX_PATH: index snapshot path
    pub fn apply_env_overrides(&mut self) {
        self.override_index_path(std::env::var(INDEX_PATH_ENV).ok());
    }

    fn override_index_path(&mut self, value: Option<String>) {
        if let Some(path) = value.filter(|p| !p.trim().is_empty()) {
            tracing::debug!("Index path overridden from {}: {}", INDEX_PATH_ENV, path);
            self.index.path = Some(PathBuf::from(path));
        }
    }
}
