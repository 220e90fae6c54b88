//! Second-pass relevance scoring over a small candidate set

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::error::Result;
use crate::normalize::tokenize;

/// Scores each candidate against the query; output is aligned with `candidates`
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(&self, query: &str, candidates: &[&str]) -> Result<Vec<f32>>;

    fn model_name(&self) -> &str;
}

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "any", "are", "as", "at", "be", "been", "by", "for", "from", "has", "have",
    "in", "into", "is", "it", "its", "of", "on", "or", "shall", "such", "that", "the", "their",
    "this", "to", "was", "were", "which", "will", "with",
];

/// Overlap coefficient of content tokens: `|q ∩ d| / min(|q|, |d|)`.
///
/// Sees query and candidate jointly, unlike the bag-of-words vector search.
/// Scores lie in [0, 1]; an empty side scores 0.
#[derive(Debug, Clone, Default)]
pub struct LexicalReranker;

impl LexicalReranker {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, query: &str, candidate: &str) -> f32 {
        let q = content_terms(query);
        let d = content_terms(candidate);
        let smaller = q.len().min(d.len());
        if smaller == 0 {
            return 0.0;
        }
        q.intersection(&d).count() as f32 / smaller as f32
    }
}

fn content_terms(text: &str) -> BTreeSet<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

#[async_trait]
impl Reranker for LexicalReranker {
    async fn rerank(&self, query: &str, candidates: &[&str]) -> Result<Vec<f32>> {
        Ok(candidates.iter().map(|c| self.score(query, c)).collect())
    }

    fn model_name(&self) -> &str {
        "lexical-overlap"
    }
}
