//! Mock cover fetcher for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::fetcher::{CoverError, CoverFetcher};

/// JPEG SOI marker plus padding.
const MOCK_COVER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];

/// Mock implementation of the CoverFetcher trait.
#[derive(Debug)]
pub struct MockCoverFetcher {
    urls: Arc<RwLock<Vec<Option<String>>>>,
    fail: Arc<RwLock<bool>>,
}

impl Default for MockCoverFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCoverFetcher {
    pub fn new() -> Self {
        Self {
            urls: Arc::new(RwLock::new(Vec::new())),
            fail: Arc::new(RwLock::new(false)),
        }
    }

    /// Make every fetch with a URL fail.
    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    /// URLs requested so far, `None` for tracks without a cover.
    pub async fn recorded_urls(&self) -> Vec<Option<String>> {
        self.urls.read().await.clone()
    }
}

#[async_trait]
impl CoverFetcher for MockCoverFetcher {
    async fn fetch(&self, url: Option<&str>, dest: &Path) -> Result<Option<PathBuf>, CoverError> {
        self.urls.write().await.push(url.map(str::to_string));

        if url.is_none() {
            return Ok(None);
        }
        if *self.fail.read().await {
            return Err(CoverError::Status(500));
        }

        tokio::fs::write(dest, MOCK_COVER).await?;
        Ok(Some(dest.to_path_buf()))
    }
}
