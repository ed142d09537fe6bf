//! Mock media fetcher for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::fetcher::{FetchError, MediaFetcher};

/// Content written for every successful fetch. Long enough to carry an ID3 tag.
pub const MOCK_AUDIO: &[u8] = b"mock audio payload standing in for an encoded mp3 stream";

/// Mock implementation of the MediaFetcher trait.
///
/// Writes [`MOCK_AUDIO`] to `<output_base>.mp3` unless the query was marked
/// as failing.
#[derive(Debug)]
pub struct MockMediaFetcher {
    queries: Arc<RwLock<Vec<String>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    delay_ms: Arc<RwLock<u64>>,
}

impl Default for MockMediaFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMediaFetcher {
    pub fn new() -> Self {
        Self {
            queries: Arc::new(RwLock::new(Vec::new())),
            failing: Arc::new(RwLock::new(HashSet::new())),
            delay_ms: Arc::new(RwLock::new(0)),
        }
    }

    /// Make every fetch for `query` fail.
    pub async fn fail_query(&self, query: &str) {
        self.failing.write().await.insert(query.to_string());
    }

    /// Delay every fetch.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay_ms.write().await = delay.as_millis() as u64;
    }

    /// Queries fetched so far, in order.
    pub async fn recorded_queries(&self) -> Vec<String> {
        self.queries.read().await.clone()
    }
}

#[async_trait]
impl MediaFetcher for MockMediaFetcher {
    fn output_extension(&self) -> &str {
        "mp3"
    }

    async fn fetch(&self, query: &str, output_base: &Path) -> Result<PathBuf, FetchError> {
        self.queries.write().await.push(query.to_string());

        let delay = *self.delay_ms.read().await;
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.failing.read().await.contains(query) {
            return Err(FetchError::download_failed(
                "ERROR: mock download failure",
                None,
            ));
        }

        let mut path = output_base.as_os_str().to_owned();
        path.push(".mp3");
        let path = PathBuf::from(path);

        tokio::fs::write(&path, MOCK_AUDIO).await?;
        Ok(path)
    }
}
