//! Mock archiver for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::archiver::{ArchiveError, Archiver, ZipArchiver};

/// Mock implementation of the Archiver trait.
///
/// Packages with the real zip archiver unless told to fail.
#[derive(Debug)]
pub struct MockArchiver {
    calls: Arc<RwLock<Vec<(PathBuf, PathBuf)>>>,
    fail: Arc<RwLock<bool>>,
}

impl Default for MockArchiver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockArchiver {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            fail: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    /// `(source_dir, dest)` of every call.
    pub async fn recorded_calls(&self) -> Vec<(PathBuf, PathBuf)> {
        self.calls.read().await.clone()
    }
}

#[async_trait]
impl Archiver for MockArchiver {
    async fn archive(
        &self,
        source_dir: &Path,
        dest: &Path,
        extension: &str,
    ) -> Result<usize, ArchiveError> {
        self.calls
            .write()
            .await
            .push((source_dir.to_path_buf(), dest.to_path_buf()));

        if *self.fail.read().await {
            return Err(ArchiveError::TaskFailed("mock archive failure".to_string()));
        }

        ZipArchiver::new().archive(source_dir, dest, extension).await
    }
}
