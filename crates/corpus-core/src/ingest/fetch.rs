//! Raw content retrieval for configured sources

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use crate::error::{CorpusError, Result};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches the raw bytes behind a source url
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// HTTP(S) fetcher that also reads `file://` urls and bare paths
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CorpusError::config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn fetch_http(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CorpusError::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CorpusError::fetch(url, format!("HTTP {}", status)));
        }

        let body = response.bytes().await.map_err(|e| CorpusError::fetch(url, e))?;
        Ok(body.to_vec())
    }

    async fn fetch_file(&self, url: &str, path: &Path) -> Result<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .map_err(|e| CorpusError::fetch(url, e))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!("Fetching {}", url);
        if url.starts_with("http://") || url.starts_with("https://") {
            self.fetch_http(url).await
        } else if let Some(path) = url.strip_prefix("file://") {
            self.fetch_file(url, Path::new(path)).await
        } else {
            self.fetch_file(url, Path::new(url)).await
        }
    }
}
