//! Sliding-window chunking of normalized source text

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::config::ChunkingConfig;
use crate::error::Result;

/// A fixed-size slice of normalized source text, the unit of indexing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source_ref: String,
    /// Character offset of the window in the normalized source
    pub offset: usize,
    pub tags: BTreeSet<String>,
}

/// Splits text into chunks
pub trait Chunker: Send + Sync {
    fn name(&self) -> &str;

    fn chunk(&self, source_ref: &str, text: &str, tags: &BTreeSet<String>) -> Vec<Chunk>;
}

/// Overlapping windows of `chunk_size` characters advancing by `chunk_size - chunk_overlap`.
///
/// The last window ends exactly at the end of the text; text shorter than one
/// window yields a single chunk.
#[derive(Debug, Clone, Copy)]
pub struct FixedSizeChunker {
    size: usize,
    overlap: usize,
}

impl FixedSizeChunker {
    /// Fails with a configuration error unless `0 < overlap < size`
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            size: config.chunk_size,
            overlap: config.chunk_overlap,
        })
    }

    fn stride(&self) -> usize {
        self.size - self.overlap
    }
}

impl Chunker for FixedSizeChunker {
    fn name(&self) -> &str {
        "fixed"
    }

    fn chunk(&self, source_ref: &str, text: &str, tags: &BTreeSet<String>) -> Vec<Chunk> {
        // byte position of every char boundary, so windows are counted in chars
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total = bounds.len() - 1;
        if total == 0 {
            return Vec::new();
        }

        let mut chunks = Vec::with_capacity(total / self.stride() + 1);
        let mut start = 0;
        loop {
            let end = (start + self.size).min(total);
            chunks.push(Chunk {
                text: text[bounds[start]..bounds[end]].to_string(),
                source_ref: source_ref.to_string(),
                offset: start,
                tags: tags.clone(),
            });
            if end == total {
                break;
            }
            start += self.stride();
        }

        chunks
    }
}
