//! Packaging a session directory into a single downloadable archive.

mod zip_archiver;

pub use zip_archiver::ZipArchiver;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while packaging.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Source directory has no parent: {path}")]
    InvalidSource { path: PathBuf },

    #[error("Failed to walk source directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive task failed: {0}")]
    TaskFailed(String),
}

/// Packages audio files into one artifact.
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Archive every file under `source_dir` whose extension is `extension`.
    ///
    /// Entry names are relative to the parent of `source_dir`, so the archive
    /// root holds a single folder named after the session directory. Returns
    /// the number of entries written.
    async fn archive(
        &self,
        source_dir: &Path,
        dest: &Path,
        extension: &str,
    ) -> Result<usize, ArchiveError>;
}
