//! Embedding track metadata into audio files.

mod id3_writer;

pub use id3_writer::Id3TagWriter;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::catalog::TrackDescriptor;

/// Errors that can occur while writing tags.
#[derive(Debug, Error)]
pub enum TagError {
    #[error("Failed to read existing tag from {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("Failed to write tag to {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("Failed to read cover image: {0}")]
    Cover(#[source] std::io::Error),

    #[error("Tagging task failed: {0}")]
    TaskFailed(String),
}

/// Writes descriptive metadata into an audio file in place.
#[async_trait]
pub trait TagWriter: Send + Sync {
    async fn write_tags(
        &self,
        audio_path: &Path,
        track: &TrackDescriptor,
        cover_path: Option<&Path>,
    ) -> Result<(), TagError>;
}
