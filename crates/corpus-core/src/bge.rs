//! ONNX-backed BGE collaborators (enabled with the `fastembed` feature)

use async_trait::async_trait;
use fastembed::{
    EmbeddingModel, InitOptions, RerankInitOptions, RerankerModel, TextEmbedding, TextRerank,
};
use std::sync::Mutex;

use crate::embeddings::{Embedder, Embedding};
use crate::error::{CorpusError, Result};
use crate::rerank::Reranker;

/// BGE embedder using BAAI/bge-small-en-v1.5 (384 dimensions).
pub struct BgeEmbedder {
    model: Mutex<TextEmbedding>,
}

impl BgeEmbedder {
    /// Downloads the model on first use.
    pub fn new() -> Result<Self> {
        let opts = InitOptions::new(EmbeddingModel::BGESmallENV15).with_show_download_progress(true);

        TextEmbedding::try_new(opts)
            .map(|model| Self {
                model: Mutex::new(model),
            })
            .map_err(|e| CorpusError::Embedding(e.to_string()))
    }

    fn run(&self, texts: Vec<String>) -> Result<Vec<Embedding>> {
        let mut model = self
            .model
            .lock()
            .map_err(|_| CorpusError::Embedding("embedding model lock poisoned".to_string()))?;
        model
            .embed(texts, None)
            .map_err(|e| CorpusError::Embedding(e.to_string()))
    }
}

#[async_trait]
impl Embedder for BgeEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        self.run(texts.iter().map(|t| t.to_string()).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Embedding> {
        // BGE expects an instruction prefix on queries
        let query_text = format!("Represent this sentence for searching relevant passages: {text}");
        self.run(vec![query_text])?
            .into_iter()
            .next()
            .ok_or_else(|| CorpusError::Embedding("model returned no embeddings".to_string()))
    }

    fn dimension(&self) -> usize {
        384
    }

    fn model_name(&self) -> &str {
        "BAAI/bge-small-en-v1.5"
    }
}

/// Cross-encoder reranker using BAAI/bge-reranker-base.
pub struct BgeReranker {
    model: Mutex<TextRerank>,
}

impl BgeReranker {
    /// Downloads the model on first use.
    pub fn new() -> Result<Self> {
        let opts = RerankInitOptions::new(RerankerModel::BGERerankerBase)
            .with_show_download_progress(true);

        TextRerank::try_new(opts)
            .map(|model| Self {
                model: Mutex::new(model),
            })
            .map_err(|e| CorpusError::Rerank(e.to_string()))
    }
}

#[async_trait]
impl Reranker for BgeReranker {
    async fn rerank(&self, query: &str, candidates: &[&str]) -> Result<Vec<f32>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let mut model = self
            .model
            .lock()
            .map_err(|_| CorpusError::Rerank("reranker lock poisoned".to_string()))?;
        let results = model
            .rerank(query, candidates, false, None)
            .map_err(|e| CorpusError::Rerank(e.to_string()))?;

        // results come back sorted; put scores back in candidate order
        let mut scores = vec![0.0f32; candidates.len()];
        for result in results {
            if let Some(slot) = scores.get_mut(result.index) {
                *slot = result.score;
            }
        }
        Ok(scores)
    }

    fn model_name(&self) -> &str {
        "BAAI/bge-reranker-base"
    }
}
