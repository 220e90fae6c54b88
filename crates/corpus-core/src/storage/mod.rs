//! Vector index for the regulatory corpus
//!
//! Records are keyed by a content-derived id, so upserts from concurrent
//! ingestion workers touching distinct ids never conflict and re-ingesting
//! unchanged text is a no-op.

pub mod memory;
pub mod persistent;

pub use memory::MemoryIndex;
pub use persistent::PersistentIndex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::chunk::Chunk;
use crate::config::IndexConfig;
use crate::embeddings::Embedding;
use crate::error::{CorpusError, Result};

/// Stable record id: SHA-256 over (source_ref, offset, text)
pub fn record_id(source_ref: &str, offset: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_ref.as_bytes());
    hasher.update([0u8]);
    hasher.update(offset.to_le_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub source_url: String,
    pub tags: BTreeSet<String>,
    pub offset: usize,
}

/// An indexed chunk with its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Embedding,
    pub text: String,
    pub metadata: RecordMetadata,
}

impl VectorRecord {
    pub fn from_chunk(chunk: &Chunk, vector: Embedding) -> Self {
        Self {
            id: record_id(&chunk.source_ref, chunk.offset, &chunk.text),
            vector,
            text: chunk.text.clone(),
            metadata: RecordMetadata {
                source_url: chunk.source_ref.clone(),
                tags: chunk.tags.clone(),
                offset: chunk.offset,
            },
        }
    }
}

/// Restricts the candidate pool before vector search.
///
/// A record passes when it carries every tag in `tags` and none in
/// `exclude_tags`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub exclude_tags: BTreeSet<String>,
}

impl SearchFilter {
    pub fn tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            exclude_tags: BTreeSet::new(),
        }
    }

    pub fn excluding<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.exclude_tags.is_empty()
    }

    pub fn matches(&self, metadata: &RecordMetadata) -> bool {
        self.tags.is_subset(&metadata.tags) && self.exclude_tags.is_disjoint(&metadata.tags)
    }
}

/// A search candidate with its cosine similarity to the query
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub record: VectorRecord,
    pub similarity: f32,
}

/// Counts from one upsert batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertOutcome {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl UpsertOutcome {
    pub fn changed(&self) -> bool {
        self.added > 0 || self.updated > 0
    }
}

/// Collection statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_records: usize,
    pub dimension: usize,
    pub sources: BTreeMap<String, usize>,
    pub tags: BTreeMap<String, usize>,
}

/// Store of (vector, text, metadata) triples with nearest-neighbour search
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace records by id
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<UpsertOutcome>;

    /// The `k` most similar records, ties broken by lower offset then id
    async fn search(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<ScoredRecord>>;

    async fn count(&self) -> Result<usize>;

    async fn clear(&self) -> Result<()>;

    /// Drop records of `source_url` whose ids are not in `keep`; returns how many went
    async fn remove_stale(&self, source_url: &str, keep: &BTreeSet<String>) -> Result<usize>;

    /// Drop every record whose source is not in `configured`; returns how many went
    async fn prune_sources(&self, configured: &BTreeSet<String>) -> Result<usize>;

    async fn stats(&self) -> Result<IndexStats>;

    /// All records ordered by id
    async fn records(&self) -> Result<Vec<VectorRecord>>;
}

/// Open the index described by the configuration: on disk when a path is set
pub async fn open_index(config: &IndexConfig) -> Result<Arc<dyn VectorIndex>> {
    match &config.path {
        Some(path) => Ok(Arc::new(PersistentIndex::open(path, config.dimension).await?)),
        None => Ok(Arc::new(MemoryIndex::new(config.dimension))),
    }
}

/// Cosine similarity in [-1, 1]; zero vectors score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Record table shared by the in-memory and on-disk indexes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct IndexState {
    pub dimension: usize,
    pub records: BTreeMap<String, VectorRecord>,
}

impl IndexState {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            records: BTreeMap::new(),
        }
    }

    fn check_dimension(&self, len: usize, what: &str) -> Result<()> {
        if len != self.dimension {
            return Err(CorpusError::Storage(format!(
                "{} has dimension {}, index expects {}",
                what, len, self.dimension
            )));
        }
        Ok(())
    }

    pub fn upsert(&mut self, records: Vec<VectorRecord>) -> Result<UpsertOutcome> {
        for record in &records {
            self.check_dimension(record.vector.len(), &format!("record {}", record.id))?;
        }

        let mut outcome = UpsertOutcome::default();
        for record in records {
            match self.records.get(&record.id) {
                Some(existing) if *existing == record => outcome.unchanged += 1,
                Some(_) => {
                    outcome.updated += 1;
                    self.records.insert(record.id.clone(), record);
                }
                None => {
                    outcome.added += 1;
                    self.records.insert(record.id.clone(), record);
                }
            }
        }
        Ok(outcome)
    }

    pub fn search(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<ScoredRecord>> {
        self.check_dimension(vector.len(), "query vector")?;

        let mut results: Vec<ScoredRecord> = self
            .records
            .values()
            .filter(|r| filter.map_or(true, |f| f.matches(&r.metadata)))
            .map(|r| ScoredRecord {
                similarity: cosine_similarity(vector, &r.vector),
                record: r.clone(),
            })
            .collect();

        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.record.metadata.offset.cmp(&b.record.metadata.offset))
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
        results.truncate(k);
        Ok(results)
    }

    pub fn remove_stale(&mut self, source_url: &str, keep: &BTreeSet<String>) -> usize {
        let before = self.records.len();
        self.records
            .retain(|id, r| r.metadata.source_url != source_url || keep.contains(id));
        before - self.records.len()
    }

    pub fn prune_sources(&mut self, configured: &BTreeSet<String>) -> usize {
        let before = self.records.len();
        self.records
            .retain(|_, r| configured.contains(&r.metadata.source_url));
        before - self.records.len()
    }

    pub fn stats(&self) -> IndexStats {
        let mut stats = IndexStats {
            total_records: self.records.len(),
            dimension: self.dimension,
            ..IndexStats::default()
        };
        for record in self.records.values() {
            *stats
                .sources
                .entry(record.metadata.source_url.clone())
                .or_insert(0) += 1;
            for tag in &record.metadata.tags {
                *stats.tags.entry(tag.clone()).or_insert(0) += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub fn record(source: &str, offset: usize, text: &str, vector: Vec<f32>, tags: &[&str]) -> VectorRecord {
        VectorRecord::from_chunk(
            &Chunk {
                text: text.to_string(),
                source_ref: source.to_string(),
                offset,
                tags: tags.iter().map(|t| t.to_string()).collect(),
            },
            vector,
        )
    }

    #[test]
    fn test_record_id_is_pure() {
        let a = record_id("https://example.test/a", 0, "ADGM Courts");
        assert_eq!(a, record_id("https://example.test/a", 0, "ADGM Courts"));
        assert_ne!(a, record_id("https://example.test/a", 1, "ADGM Courts"));
        assert_ne!(a, record_id("https://example.test/b", 0, "ADGM Courts"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_filter_requires_all_tags() {
        let filter = SearchFilter::tags(["taxonomy", "process:Company Incorporation"]);
        let tagged = record("s", 0, "t", vec![1.0], &["taxonomy", "process:Company Incorporation", "entity:x"]);
        let partial = record("s", 0, "t", vec![1.0], &["taxonomy"]);
        assert!(filter.matches(&tagged.metadata));
        assert!(!filter.matches(&partial.metadata));
    }

    #[test]
    fn test_filter_excluded_tags() {
        let filter = SearchFilter::default().excluding(["taxonomy"]);
        let descriptor = record("taxonomy://x", 0, "t", vec![1.0], &["taxonomy", "process:x"]);
        let regulation = record("https://example.test", 0, "t", vec![1.0], &["incorporation"]);
        let untagged = record("https://example.test", 1, "t", vec![1.0], &[]);
        assert!(!filter.matches(&descriptor.metadata));
        assert!(filter.matches(&regulation.metadata));
        assert!(filter.matches(&untagged.metadata));
        assert!(!filter.is_empty());
    }

    #[test]
    fn test_upsert_counts() {
        let mut state = IndexState::new(2);
        let r = record("s", 0, "a", vec![1.0, 0.0], &[]);

        let first = state.upsert(vec![r.clone()]).unwrap();
        assert_eq!(first, UpsertOutcome { added: 1, updated: 0, unchanged: 0 });

        let second = state.upsert(vec![r.clone()]).unwrap();
        assert_eq!(second, UpsertOutcome { added: 0, updated: 0, unchanged: 1 });

        let mut retagged = r;
        retagged.metadata.tags.insert("companies".to_string());
        let third = state.upsert(vec![retagged]).unwrap();
        assert_eq!(third, UpsertOutcome { added: 0, updated: 1, unchanged: 0 });
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut state = IndexState::new(3);
        let err = state.upsert(vec![record("s", 0, "a", vec![1.0], &[])]).unwrap_err();
        assert!(matches!(err, CorpusError::Storage(_)));
        assert!(state.search(&[1.0], 1, None).is_err());
    }

    #[test]
    fn test_search_ties_break_by_offset_then_id() {
        let mut state = IndexState::new(2);
        state
            .upsert(vec![
                record("s", 40, "later", vec![1.0, 0.0], &[]),
                record("s", 0, "earlier", vec![1.0, 0.0], &[]),
                record("s", 10, "weaker", vec![0.5, 0.5], &[]),
            ])
            .unwrap();

        let results = state.search(&[1.0, 0.0], 3, None).unwrap();
        let texts: Vec<&str> = results.iter().map(|r| r.record.text.as_str()).collect();
        assert_eq!(texts, vec!["earlier", "later", "weaker"]);
    }

    #[test]
    fn test_remove_stale_scoped_to_source() {
        let mut state = IndexState::new(1);
        let keep = record("a", 0, "keep", vec![1.0], &[]);
        state
            .upsert(vec![
                keep.clone(),
                record("a", 5, "drop", vec![1.0], &[]),
                record("b", 0, "other source", vec![1.0], &[]),
            ])
            .unwrap();

        let keep_ids: BTreeSet<String> = [keep.id].into_iter().collect();
        assert_eq!(state.remove_stale("a", &keep_ids), 1);
        assert_eq!(state.records.len(), 2);
    }

    #[test]
    fn test_prune_drops_unconfigured_sources() {
        let mut state = IndexState::new(1);
        state
            .upsert(vec![
                record("a", 0, "kept", vec![1.0], &[]),
                record("taxonomy://Employment/x", 0, "kept too", vec![1.0], &["taxonomy"]),
                record("retired", 0, "gone", vec![1.0], &[]),
                record("retired", 5, "gone too", vec![1.0], &[]),
            ])
            .unwrap();

        let configured: BTreeSet<String> = ["a", "taxonomy://Employment/x"].iter().map(|s| s.to_string()).collect();
        assert_eq!(state.prune_sources(&configured), 2);
        assert!(state.records.values().all(|r| r.metadata.source_url != "retired"));
        assert_eq!(state.prune_sources(&configured), 0);
    }

    #[test]
    fn test_stats_tag_distribution() {
        let mut state = IndexState::new(1);
        state
            .upsert(vec![
                record("a", 0, "x", vec![1.0], &["incorporation"]),
                record("a", 1, "y", vec![1.0], &["incorporation", "companies"]),
            ])
            .unwrap();

        let stats = state.stats();
        assert_eq!(stats.total_records, 2);
        assert_eq!(stats.tags["incorporation"], 2);
        assert_eq!(stats.tags["companies"], 1);
        assert_eq!(stats.sources["a"], 2);
    }
}
