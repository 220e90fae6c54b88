//! Text embedding collaborators
//!
//! The default [`HashingEmbedder`] is a feature-hashed bag of words: every token
//! is hashed with SHA-256 into one of D buckets with a hash-derived sign, and the
//! result is L2-normalized. It is a pure function of the text, which keeps
//! re-ingestion idempotent and analysis runs reproducible.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::{CorpusError, Result};
use crate::normalize::tokenize;

/// A vector embedding of fixed dimension
pub type Embedding = Vec<f32>;

/// Maps text to a fixed-length vector
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed chunk texts for indexing
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Embedding>>;

    /// Embed a single query for searching
    async fn embed_query(&self, text: &str) -> Result<Embedding>;

    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Deterministic feature-hashing embedder
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(CorpusError::config("embedding dimension must be greater than 0"));
        }
        Ok(Self { dimension })
    }

    /// Embed synchronously
    pub fn embed(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0f32; self.dimension];

        for token in tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        l2_normalize(&mut vector);
        vector
    }
}

/// Scale a vector to unit length; the zero vector is left untouched
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Embedding> {
        Ok(self.embed(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "sha256-feature-hashing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[test]
    fn test_embedding_dimension() {
        let embedder = HashingEmbedder::new(64).unwrap();
        assert_eq!(embedder.embed("ADGM Courts").len(), 64);
        assert_eq!(embedder.dimension(), 64);
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(HashingEmbedder::new(0).is_err());
    }

    #[test]
    fn test_deterministic() {
        let embedder = HashingEmbedder::new(128).unwrap();
        assert_eq!(
            embedder.embed("Articles of Association"),
            embedder.embed("Articles of Association")
        );
    }

    #[test]
    fn test_unit_length() {
        let embedder = HashingEmbedder::new(128).unwrap();
        let v = embedder.embed("The registered office shall be in Abu Dhabi Global Market");
        assert!((norm(&v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(16).unwrap();
        assert!(embedder.embed("  ,. ").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_case_insensitive() {
        let embedder = HashingEmbedder::new(32).unwrap();
        assert_eq!(embedder.embed("ADGM COURTS"), embedder.embed("adgm courts"));
    }

    #[tokio::test]
    async fn test_query_matches_document_embedding() {
        let embedder = HashingEmbedder::new(32).unwrap();
        let docs = embedder.embed_documents(&["share capital"]).await.unwrap();
        let query = embedder.embed_query("share capital").await.unwrap();
        assert_eq!(docs[0], query);
    }
}
