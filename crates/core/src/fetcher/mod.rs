//! Audio and cover art acquisition.
//!
//! [`MediaFetcher`] locates a track by search query and leaves an encoded
//! audio file on disk. [`CoverFetcher`] downloads album artwork.

mod cover;
mod ytdlp;

pub use cover::{CoverFetcherConfig, HttpCoverFetcher};
pub use ytdlp::{YtDlpConfig, YtDlpFetcher};

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while fetching audio.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Downloader binary not found.
    #[error("yt-dlp not found at path: {path}")]
    BinaryNotFound { path: PathBuf },

    /// The downloader ran but did not produce audio.
    #[error("{reason}")]
    DownloadFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// The downloader exceeded its time budget and was killed.
    #[error("Download timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error while running the downloader.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Creates a new download failed error with optional stderr output.
    pub fn download_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::DownloadFailed {
            reason: reason.into(),
            stderr,
        }
    }
}

/// Errors that can occur while fetching cover art.
#[derive(Debug, Error)]
pub enum CoverError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Cover request returned status {0}")]
    Status(u16),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Locates and downloads audio for a search query.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Extension of the files this fetcher produces, without the dot.
    fn output_extension(&self) -> &str;

    /// Download the best match for `query` and encode it to the target format.
    ///
    /// `output_base` is the destination path without extension. Returns the
    /// path of the written file, `output_base` plus [`output_extension`].
    ///
    /// [`output_extension`]: MediaFetcher::output_extension
    async fn fetch(&self, query: &str, output_base: &Path) -> Result<PathBuf, FetchError>;
}

/// Downloads cover images.
#[async_trait]
pub trait CoverFetcher: Send + Sync {
    /// Download `url` to `dest`.
    ///
    /// Returns `Ok(None)` without touching the filesystem when there is no URL.
    async fn fetch(&self, url: Option<&str>, dest: &Path) -> Result<Option<PathBuf>, CoverError>;
}
