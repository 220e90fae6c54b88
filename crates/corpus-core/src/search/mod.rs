//! Retrieval over the regulatory corpus
//!
//! This module provides:
//! - Query and result types
//! - Score gating (rerank ordering, minimum score, truncation)
//! - The retriever: embed → vector search → rerank → gate

pub mod gating;
pub mod retriever;

pub use gating::ScoreGate;
pub use retriever::Retriever;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::config::RagConfig;
use crate::storage::{SearchFilter, VectorRecord};

/// Retrieval query parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    /// Candidate pool restriction; empty means the whole corpus
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Records carrying any of these tags are never candidates
    #[serde(default)]
    pub exclude_tags: BTreeSet<String>,
    pub top_k: usize,
    pub rerank_k: usize,
    pub min_score: f32,
}

impl Query {
    /// Query with the retrieval parameters of `config`
    pub fn new(text: impl Into<String>, config: &RagConfig) -> Self {
        Self {
            text: text.into(),
            tags: BTreeSet::new(),
            exclude_tags: BTreeSet::new(),
            top_k: config.top_k,
            rerank_k: config.rerank_k,
            min_score: config.min_score,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn without_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn filter(&self) -> Option<SearchFilter> {
        let filter = SearchFilter {
            tags: self.tags.clone(),
            exclude_tags: self.exclude_tags.clone(),
        };
        (!filter.is_empty()).then_some(filter)
    }
}

/// A passage that cleared the score gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub record: VectorRecord,
    pub similarity_score: f32,
    pub rerank_score: f32,
}

/// Passages ordered by rerank score, highest first.
///
/// Empty when nothing cleared the gate, which is a valid outcome rather than
/// an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub passages: Vec<RetrievedPassage>,
}

impl RetrievalResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    /// The best passage, if any
    pub fn top(&self) -> Option<&RetrievedPassage> {
        self.passages.first()
    }
}
