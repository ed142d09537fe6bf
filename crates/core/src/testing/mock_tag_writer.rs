//! Mock tag writer for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::catalog::TrackDescriptor;
use crate::tagger::{TagError, TagWriter};

/// A recorded tag write for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedTagWrite {
    pub audio_path: PathBuf,
    pub track: TrackDescriptor,
    pub cover_path: Option<PathBuf>,
    /// Whether the cover file was on disk at the time of the call.
    pub cover_existed: bool,
}

/// Mock implementation of the TagWriter trait. Never touches the audio file.
#[derive(Debug)]
pub struct MockTagWriter {
    calls: Arc<RwLock<Vec<RecordedTagWrite>>>,
    fail: Arc<RwLock<bool>>,
}

impl Default for MockTagWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTagWriter {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            fail: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    pub async fn recorded_calls(&self) -> Vec<RecordedTagWrite> {
        self.calls.read().await.clone()
    }
}

#[async_trait]
impl TagWriter for MockTagWriter {
    async fn write_tags(
        &self,
        audio_path: &Path,
        track: &TrackDescriptor,
        cover_path: Option<&Path>,
    ) -> Result<(), TagError> {
        self.calls.write().await.push(RecordedTagWrite {
            audio_path: audio_path.to_path_buf(),
            track: track.clone(),
            cover_path: cover_path.map(Path::to_path_buf),
            cover_existed: cover_path.map(Path::exists).unwrap_or(false),
        });

        if *self.fail.read().await {
            return Err(TagError::WriteFailed {
                path: audio_path.to_path_buf(),
                reason: "mock tag failure".to_string(),
            });
        }

        Ok(())
    }
}
