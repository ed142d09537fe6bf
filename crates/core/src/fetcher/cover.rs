use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::{CoverError, CoverFetcher};

/// Configuration for cover art downloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverFetcherConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for CoverFetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Downloads cover images over HTTP.
pub struct HttpCoverFetcher {
    client: Client,
}

impl HttpCoverFetcher {
    pub fn new(config: CoverFetcherConfig) -> Result<Self, CoverError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CoverFetcher for HttpCoverFetcher {
    async fn fetch(&self, url: Option<&str>, dest: &Path) -> Result<Option<PathBuf>, CoverError> {
        let Some(url) = url else {
            return Ok(None);
        };

        debug!("Downloading cover {} to {:?}", url, dest);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CoverError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;

        Ok(Some(dest.to_path_buf()))
    }
}
