//! Retriever: embed → vector search → rerank → score gate
//!
//! Retriever calls are the unit of concurrency at analysis time. Every call
//! takes a permit from a shared semaphore (bounded by `rag.max_concurrency`)
//! and runs under `rag.timeout_ms`; an expired call returns
//! [`CorpusError::RetrievalTimeout`] so callers can degrade to "no citation".
//!
//! # Example
//!
//! ```rust,ignore
//! let retriever = Retriever::new(&config.rag, embedder, reranker, index)?;
//! let query = Query::new("jurisdiction clause ADGM", &config.rag).with_tags(["incorporation"]);
//! let result = retriever.retrieve(&query).await?;
//! if let Some(top) = result.top() {
//!     println!("{} ({:.2})", top.record.metadata.source_url, top.rerank_score);
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::config::RagConfig;
use crate::embeddings::Embedder;
use crate::error::{CorpusError, Result};
use crate::rerank::Reranker;
use crate::search::{Query, RetrievalResult, RetrievedPassage, ScoreGate};
use crate::storage::VectorIndex;

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    reranker: Arc<dyn Reranker>,
    index: Arc<dyn VectorIndex>,
    permits: Arc<Semaphore>,
    timeout: Duration,
    config: RagConfig,
}

impl Retriever {
    pub fn new(
        config: &RagConfig,
        embedder: Arc<dyn Embedder>,
        reranker: Arc<dyn Reranker>,
        index: Arc<dyn VectorIndex>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            embedder,
            reranker,
            index,
            permits: Arc::new(Semaphore::new(config.max_concurrency)),
            timeout: Duration::from_millis(config.timeout_ms),
            config: config.clone(),
        })
    }

    /// Retrieval parameters new queries should start from
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Build a query with this retriever's parameters
    pub fn query(&self, text: impl Into<String>) -> Query {
        Query::new(text, &self.config)
    }

    /// Run one retrieval within the concurrency limit and time budget
    pub async fn retrieve(&self, query: &Query) -> Result<RetrievalResult> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| CorpusError::Storage("retriever permits closed".to_string()))?;

        match tokio::time::timeout(self.timeout, self.run(query)).await {
            Ok(result) => result,
            Err(_) => Err(CorpusError::RetrievalTimeout {
                query: query.text.clone(),
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    async fn run(&self, query: &Query) -> Result<RetrievalResult> {
        if query.top_k == 0 || query.rerank_k == 0 {
            return Ok(RetrievalResult::empty());
        }

        let vector = self.embedder.embed_query(&query.text).await?;
        let filter = query.filter();
        let candidates = self
            .index
            .search(&vector, query.top_k, filter.as_ref())
            .await?;

        tracing::debug!(
            "Vector search for '{}' returned {} candidates",
            query.text,
            candidates.len()
        );
        if candidates.is_empty() {
            return Ok(RetrievalResult::empty());
        }

        let texts: Vec<&str> = candidates.iter().map(|c| c.record.text.as_str()).collect();
        let scores = self.reranker.rerank(&query.text, &texts).await?;
        if scores.len() != candidates.len() {
            return Err(CorpusError::Rerank(format!(
                "reranker {} returned {} scores for {} candidates",
                self.reranker.model_name(),
                scores.len(),
                candidates.len()
            )));
        }

        let passages = candidates
            .into_iter()
            .zip(scores)
            .map(|(candidate, rerank_score)| RetrievedPassage {
                record: candidate.record,
                similarity_score: candidate.similarity,
                rerank_score,
            })
            .collect();

        let gated = ScoreGate::for_query(query).apply(passages);
        tracing::debug!("{} passages cleared min_score {}", gated.len(), query.min_score);

        Ok(RetrievalResult { passages: gated })
    }
}
