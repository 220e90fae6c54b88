//! Ingestion pipeline: fetch → normalize → chunk → embed → upsert
//!
//! Each source runs in isolation. A failing source is logged, recorded in the
//! summary with its reason and skipped; the rest of the run continues.

pub mod fetch;

pub use fetch::{Fetcher, HttpFetcher};

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::chunk::{Chunker, FixedSizeChunker};
use crate::config::CorpusConfig;
use crate::embeddings::Embedder;
use crate::error::{CorpusError, Result};
use crate::normalize::{clean_text, extract_text};
use crate::source::Source;
use crate::storage::{UpsertOutcome, VectorIndex, VectorRecord};

/// A source that was skipped during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedSource {
    pub url: String,
    pub reason: String,
}

/// Outcome of one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionSummary {
    pub sources: usize,
    pub chunks: usize,
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub errors: Vec<SkippedSource>,
}

impl IngestionSummary {
    fn record(&mut self, outcome: &SourceOutcome) {
        self.chunks += outcome.chunks;
        self.added += outcome.upsert.added;
        self.updated += outcome.upsert.updated;
        self.unchanged += outcome.upsert.unchanged;
        self.removed += outcome.removed;
    }
}

/// Result of indexing one source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceOutcome {
    pub chunks: usize,
    pub upsert: UpsertOutcome,
    pub removed: usize,
}

/// Document supplied directly as text rather than fetched (taxonomy descriptors)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineDocument {
    pub source_ref: String,
    pub text: String,
    pub tags: BTreeSet<String>,
}

pub struct IngestionPipeline {
    fetcher: Arc<dyn Fetcher>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    chunker: FixedSizeChunker,
    max_concurrency: usize,
}

impl IngestionPipeline {
    /// Fails with a configuration error before any work if chunking or the
    /// embedding dimension is invalid
    pub fn new(
        config: &CorpusConfig,
        fetcher: Arc<dyn Fetcher>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> Result<Self> {
        config.validate()?;
        if embedder.dimension() != config.index.dimension {
            return Err(CorpusError::config(format!(
                "embedder {} produces {} dimensions, index expects {}",
                embedder.model_name(),
                embedder.dimension(),
                config.index.dimension
            )));
        }

        Ok(Self {
            fetcher,
            embedder,
            index,
            chunker: FixedSizeChunker::new(config.chunking)?,
            max_concurrency: config.rag.max_concurrency,
        })
    }

    /// Ingest every source; re-running with unchanged sources leaves the index untouched
    pub async fn refresh(&self, sources: &[Source]) -> IngestionSummary {
        tracing::info!("Refreshing {} sources", sources.len());

        let results: Vec<(&Source, Result<SourceOutcome>)> = stream::iter(sources)
            .map(|source| async move { (source, self.process_source(source).await) })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let mut summary = IngestionSummary {
            sources: sources.len(),
            ..IngestionSummary::default()
        };
        for (source, result) in results {
            match result {
                Ok(outcome) => {
                    tracing::info!(
                        "Processed {} chunks from {} ({} added, {} updated, {} removed)",
                        outcome.chunks,
                        source.url,
                        outcome.upsert.added,
                        outcome.upsert.updated,
                        outcome.removed
                    );
                    summary.record(&outcome);
                }
                Err(e) => {
                    tracing::warn!("Skipping source {}: {}", source.url, e);
                    summary.errors.push(SkippedSource {
                        url: source.url.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Ingestion finished: {} added, {} updated, {} unchanged, {} removed, {} skipped",
            summary.added,
            summary.updated,
            summary.unchanged,
            summary.removed,
            summary.errors.len()
        );
        summary
    }

    /// Index documents that need no fetching, with the same isolation as `refresh`
    pub async fn ingest_inline(&self, documents: &[InlineDocument]) -> IngestionSummary {
        let mut summary = IngestionSummary {
            sources: documents.len(),
            ..IngestionSummary::default()
        };
        for doc in documents {
            let text = clean_text(&doc.text);
            match self.index_text(&doc.source_ref, &text, &doc.tags).await {
                Ok(outcome) => summary.record(&outcome),
                Err(e) => {
                    tracing::warn!("Skipping inline document {}: {}", doc.source_ref, e);
                    summary.errors.push(SkippedSource {
                        url: doc.source_ref.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        summary
    }

    /// Remove records of sources no longer configured.
    ///
    /// `configured` must name every source url and inline `source_ref` that
    /// should survive; a source that merely failed this run stays configured.
    pub async fn prune(&self, configured: &BTreeSet<String>) -> Result<usize> {
        let removed = self.index.prune_sources(configured).await?;
        if removed > 0 {
            tracing::info!("Pruned {} records from unconfigured sources", removed);
        }
        Ok(removed)
    }

    async fn process_source(&self, source: &Source) -> Result<SourceOutcome> {
        let bytes = self.fetcher.fetch(&source.url).await?;
        let text = extract_text(&source.url, &bytes, source.content_type)?;
        self.index_text(&source.url, &text, &source.tags).await
    }

    async fn index_text(
        &self,
        source_ref: &str,
        text: &str,
        tags: &BTreeSet<String>,
    ) -> Result<SourceOutcome> {
        // an empty body would otherwise wipe every record of the source as stale
        if text.is_empty() {
            return Err(CorpusError::fetch(source_ref, "no extractable text"));
        }

        let chunks = self.chunker.chunk(source_ref, text, tags);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = self.embedder.embed_documents(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(CorpusError::Embedding(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let records: Vec<VectorRecord> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| VectorRecord::from_chunk(chunk, vector))
            .collect();
        let keep: BTreeSet<String> = records.iter().map(|r| r.id.clone()).collect();

        let upsert = self.index.upsert(records).await?;
        let removed = self.index.remove_stale(source_ref, &keep).await?;

        Ok(SourceOutcome {
            chunks: chunks.len(),
            upsert,
            removed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkingConfig;
    use crate::embeddings::HashingEmbedder;
    use crate::source::ContentType;
    use crate::storage::MemoryIndex;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves fixed bodies; unknown urls fail like an unreachable host
    #[derive(Default)]
    struct StubFetcher {
        bodies: Mutex<HashMap<String, String>>,
    }

    impl StubFetcher {
        fn with(pages: &[(&str, &str)]) -> Self {
            let fetcher = Self::default();
            for (url, body) in pages {
                fetcher.set(url, body);
            }
            fetcher
        }

        fn set(&self, url: &str, body: &str) {
            self.bodies.lock().unwrap().insert(url.to_string(), body.to_string());
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.bodies
                .lock()
                .unwrap()
                .get(url)
                .map(|b| b.as_bytes().to_vec())
                .ok_or_else(|| CorpusError::fetch(url, "connection refused"))
        }
    }

    fn config() -> CorpusConfig {
        let mut config = CorpusConfig::default();
        config.chunking = ChunkingConfig::new(40, 10);
        config.index.dimension = 64;
        config
    }

    fn pipeline(fetcher: Arc<StubFetcher>, index: Arc<MemoryIndex>) -> IngestionPipeline {
        IngestionPipeline::new(
            &config(),
            fetcher,
            Arc::new(HashingEmbedder::new(64).unwrap()),
            index,
        )
        .unwrap()
    }

    fn sources() -> Vec<Source> {
        vec![
            Source::new("https://example.test/companies", ContentType::Html)
                .with_tags(["incorporation"]),
            Source::new("https://example.test/employment", ContentType::Text)
                .with_tags(["employment"]),
        ]
    }

    const COMPANIES: &str = "<h1>Companies</h1><p>ADGM Courts have exclusive jurisdiction over companies incorporated in the Abu Dhabi Global Market.</p>";
    const EMPLOYMENT: &str = "Employment contracts must state the governing law and the ADGM Employment Regulations 2019.";

    #[tokio::test]
    async fn test_refresh_is_idempotent() {
        let fetcher = Arc::new(StubFetcher::with(&[
            ("https://example.test/companies", COMPANIES),
            ("https://example.test/employment", EMPLOYMENT),
        ]));
        let index = Arc::new(MemoryIndex::new(64));
        let pipeline = pipeline(fetcher, index.clone());

        let first = pipeline.refresh(&sources()).await;
        assert!(first.added > 0);
        assert!(first.errors.is_empty());
        let snapshot = index.records().await.unwrap();

        let second = pipeline.refresh(&sources()).await;
        assert_eq!(second.added, 0);
        assert_eq!(second.updated, 0);
        assert_eq!(second.removed, 0);
        assert_eq!(second.unchanged, first.added);
        assert_eq!(index.records().await.unwrap(), snapshot);
    }

    #[tokio::test]
    async fn test_failing_source_is_isolated() {
        let fetcher = Arc::new(StubFetcher::with(&[("https://example.test/companies", COMPANIES)]));
        let index = Arc::new(MemoryIndex::new(64));
        let pipeline = pipeline(fetcher, index.clone());

        let summary = pipeline.refresh(&sources()).await;
        assert_eq!(summary.sources, 2);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].url, "https://example.test/employment");
        assert!(summary.errors[0].reason.contains("connection refused"));
        assert_eq!(index.count().await.unwrap(), summary.added);
    }

    #[tokio::test]
    async fn test_changed_source_removes_stale_chunks() {
        let fetcher = Arc::new(StubFetcher::with(&[("https://example.test/companies", COMPANIES)]));
        let index = Arc::new(MemoryIndex::new(64));
        let pipeline = pipeline(fetcher.clone(), index.clone());
        let companies = &sources()[..1];

        pipeline.refresh(companies).await;
        fetcher.set("https://example.test/companies", "<p>ADGM Courts have exclusive jurisdiction.</p>");
        let summary = pipeline.refresh(companies).await;

        assert!(summary.removed > 0);
        let stats = index.stats().await.unwrap();
        assert_eq!(stats.total_records, summary.added + summary.updated + summary.unchanged);
    }

    #[tokio::test]
    async fn test_empty_body_is_skipped_without_wiping() {
        let fetcher = Arc::new(StubFetcher::with(&[("https://example.test/companies", COMPANIES)]));
        let index = Arc::new(MemoryIndex::new(64));
        let pipeline = pipeline(fetcher.clone(), index.clone());
        let companies = &sources()[..1];

        let first = pipeline.refresh(companies).await;
        fetcher.set("https://example.test/companies", "<script>track()</script>");
        let second = pipeline.refresh(companies).await;

        assert_eq!(second.errors.len(), 1);
        assert_eq!(index.count().await.unwrap(), first.added);
    }

    #[tokio::test]
    async fn test_invalid_chunking_rejected_before_work() {
        let mut config = config();
        config.chunking = ChunkingConfig::new(10, 10);
        let result = IngestionPipeline::new(
            &config,
            Arc::new(StubFetcher::default()),
            Arc::new(HashingEmbedder::new(64).unwrap()),
            Arc::new(MemoryIndex::new(64)),
        );
        assert!(matches!(result.err(), Some(CorpusError::Config(_))));
    }

    #[tokio::test]
    async fn test_embedder_dimension_must_match_index() {
        let result = IngestionPipeline::new(
            &config(),
            Arc::new(StubFetcher::default()),
            Arc::new(HashingEmbedder::new(32).unwrap()),
            Arc::new(MemoryIndex::new(64)),
        );
        assert!(matches!(result.err(), Some(CorpusError::Config(_))));
    }

    #[tokio::test]
    async fn test_prune_removes_dropped_source() {
        let fetcher = Arc::new(StubFetcher::with(&[
            ("https://example.test/companies", COMPANIES),
            ("https://example.test/employment", EMPLOYMENT),
        ]));
        let index = Arc::new(MemoryIndex::new(64));
        let pipeline = pipeline(fetcher, index.clone());
        pipeline.refresh(&sources()).await;

        let remaining = &sources()[..1];
        let summary = pipeline.refresh(remaining).await;
        let configured: BTreeSet<String> = remaining.iter().map(|s| s.url.clone()).collect();
        let pruned = pipeline.prune(&configured).await.unwrap();

        assert!(pruned > 0);
        let stats = index.stats().await.unwrap();
        assert!(!stats.sources.contains_key("https://example.test/employment"));
        assert_eq!(stats.total_records, summary.added + summary.updated + summary.unchanged);
    }

    #[tokio::test]
    async fn test_ingest_inline() {
        let index = Arc::new(MemoryIndex::new(64));
        let pipeline = pipeline(Arc::new(StubFetcher::default()), index.clone());
        let docs = vec![InlineDocument {
            source_ref: "taxonomy://company-incorporation".to_string(),
            text: "Articles of Association Memorandum of Association".to_string(),
            tags: ["taxonomy".to_string()].into_iter().collect(),
        }];

        let summary = pipeline.ingest_inline(&docs).await;
        assert!(summary.added > 0);
        assert_eq!(index.stats().await.unwrap().tags["taxonomy"], summary.added);
    }
}
