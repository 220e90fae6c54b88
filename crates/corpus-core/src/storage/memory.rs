use async_trait::async_trait;
use std::collections::BTreeSet;
use tokio::sync::RwLock;

use super::{IndexState, IndexStats, ScoredRecord, SearchFilter, UpsertOutcome, VectorIndex, VectorRecord};
use crate::error::Result;

/// In-memory vector index.
///
/// Brute-force cosine search; suitable for corpora of a few thousand chunks
/// and for tests.
pub struct MemoryIndex {
    state: RwLock<IndexState>,
}

impl MemoryIndex {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            state: RwLock::new(IndexState::new(dimension)),
        }
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<UpsertOutcome> {
        self.state.write().await.upsert(records)
    }

    async fn search(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<ScoredRecord>> {
        self.state.read().await.search(vector, k, filter)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.state.read().await.records.len())
    }

    async fn clear(&self) -> Result<()> {
        self.state.write().await.records.clear();
        Ok(())
    }

    async fn remove_stale(&self, source_url: &str, keep: &BTreeSet<String>) -> Result<usize> {
        Ok(self.state.write().await.remove_stale(source_url, keep))
    }

    async fn prune_sources(&self, configured: &BTreeSet<String>) -> Result<usize> {
        Ok(self.state.write().await.prune_sources(configured))
    }

    async fn stats(&self) -> Result<IndexStats> {
        Ok(self.state.read().await.stats())
    }

    async fn records(&self) -> Result<Vec<VectorRecord>> {
        Ok(self.state.read().await.records.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests::record;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_empty_index() {
        let index = MemoryIndex::new(2);
        assert_eq!(index.count().await.unwrap(), 0);
        assert!(index.search(&[1.0, 0.0], 5, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_respects_k_and_filter() {
        let index = MemoryIndex::new(2);
        index
            .upsert(vec![
                record("a", 0, "incorporation rule", vec![1.0, 0.0], &["incorporation"]),
                record("a", 1, "employment rule", vec![1.0, 0.1], &["employment"]),
                record("a", 2, "another incorporation rule", vec![0.9, 0.3], &["incorporation"]),
            ])
            .await
            .unwrap();

        let filter = SearchFilter::tags(["incorporation"]);
        let results = index.search(&[1.0, 0.0], 5, Some(&filter)).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.record.metadata.tags.contains("incorporation")));

        let top = index.search(&[1.0, 0.0], 1, None).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].record.text, "incorporation rule");
    }

    #[tokio::test]
    async fn test_clear() {
        let index = MemoryIndex::new(1);
        index.upsert(vec![record("a", 0, "x", vec![1.0], &[])]).await.unwrap();
        index.clear().await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_upserts_distinct_ids() {
        let index = Arc::new(MemoryIndex::new(1));
        let mut handles = Vec::new();
        for worker in 0..8 {
            let index = Arc::clone(&index);
            handles.push(tokio::spawn(async move {
                let records = (0..10)
                    .map(|i| record(&format!("source-{worker}"), i, "text", vec![1.0], &[]))
                    .collect();
                index.upsert(records).await.unwrap()
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().added, 10);
        }
        assert_eq!(index.count().await.unwrap(), 80);
    }
}
