use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use super::{IndexState, IndexStats, ScoredRecord, SearchFilter, UpsertOutcome, VectorIndex, VectorRecord};
use crate::error::{CorpusError, Result};

/// Vector index persisted as a JSON snapshot.
///
/// Records are kept in id order so the snapshot of an unchanged corpus is
/// byte-identical across runs. Every mutation that changes content rewrites the
/// snapshot through a temp file and rename, so readers never see a torn file.
/// Mutations apply to a copy of the state that replaces the live one only once
/// the snapshot is written; a failed write leaves memory matching disk.
pub struct PersistentIndex {
    path: PathBuf,
    state: RwLock<IndexState>,
}

impl PersistentIndex {
    /// Load the snapshot at `path`, or start empty if none exists yet
    pub async fn open(path: &Path, dimension: usize) -> Result<Self> {
        let state = match tokio::fs::read(path).await {
            Ok(bytes) => {
                let state: IndexState = serde_json::from_slice(&bytes)?;
                if state.dimension != dimension {
                    return Err(CorpusError::Storage(format!(
                        "index at {} has dimension {}, configuration expects {}",
                        path.display(),
                        state.dimension,
                        dimension
                    )));
                }
                tracing::info!(
                    "Opened index {} with {} records",
                    path.display(),
                    state.records.len()
                );
                state
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No index at {}, starting empty", path.display());
                IndexState::new(dimension)
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, state: &IndexState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec(state)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!(
            "Persisted {} records to {}",
            state.records.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for PersistentIndex {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<UpsertOutcome> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let outcome = next.upsert(records)?;
        if outcome.changed() {
            self.persist(&next).await?;
            *state = next;
        }
        Ok(outcome)
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
        let mut state = self.state.write().await;
        let next = IndexState::new(state.dimension);
        self.persist(&next).await?;
        *state = next;
        Ok(())
    }

    async fn remove_stale(&self, source_url: &str, keep: &BTreeSet<String>) -> Result<usize> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let removed = next.remove_stale(source_url, keep);
        if removed > 0 {
            self.persist(&next).await?;
            *state = next;
        }
        Ok(removed)
    }

    async fn prune_sources(&self, configured: &BTreeSet<String>) -> Result<usize> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let removed = next.prune_sources(configured);
        if removed > 0 {
            self.persist(&next).await?;
            *state = next;
        }
        Ok(removed)
    }

    async fn stats(&self) -> Result<IndexStats> {
        Ok(self.state.read().await.stats())
    }

    async fn records(&self) -> Result<Vec<VectorRecord>> {
        Ok(self.state.read().await.records.values().cloned().collect())
    }
}
