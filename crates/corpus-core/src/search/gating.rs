//! Minimum-score gating of reranked candidates
//!
//! Candidates are ordered by rerank score (descending), entries below the
//! minimum score are dropped outright, and the remainder is truncated to
//! `rerank_k`. Ties fall back to vector similarity, then chunk offset, then id,
//! so the output is fully deterministic.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::search::{Query, RetrievedPassage};

/// Score gate for reranked retrieval candidates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreGate {
    pub min_score: f32,
    pub rerank_k: usize,
}

impl ScoreGate {
    pub fn new(min_score: f32, rerank_k: usize) -> Self {
        Self {
            min_score,
            rerank_k,
        }
    }

    pub fn for_query(query: &Query) -> Self {
        Self::new(query.min_score, query.rerank_k)
    }

    /// Whether a single rerank score clears the gate
    pub fn passes(&self, rerank_score: f32) -> bool {
        rerank_score >= self.min_score
    }

    /// Order, gate and truncate candidates
    pub fn apply(&self, mut candidates: Vec<RetrievedPassage>) -> Vec<RetrievedPassage> {
        candidates.sort_by(compare);

        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .filter(|p| self.passes(p.rerank_score))
            .filter(|p| seen.insert(p.record.id.clone()))
            .take(self.rerank_k)
            .collect()
    }
}

fn compare(a: &RetrievedPassage, b: &RetrievedPassage) -> Ordering {
    b.rerank_score
        .partial_cmp(&a.rerank_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.record.metadata.offset.cmp(&b.record.metadata.offset))
        .then_with(|| a.record.id.cmp(&b.record.id))
}
