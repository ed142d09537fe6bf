//! Orchestrator configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::progress::DEFAULT_PROGRESS_BUFFER;

/// Configuration for the session orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Root directory for session working directories and archives.
    /// Each session owns `downloads_dir/<id>/` and `downloads_dir/<id>.zip`.
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,

    /// How long a finished session stays retrievable (milliseconds).
    #[serde(default = "default_retention_ms")]
    pub retention_ms: u64,

    /// Prefix of the retrieval reference published on completion.
    /// The full reference is `{prefix}/{id}/download`.
    #[serde(default = "default_download_url_prefix")]
    pub download_url_prefix: String,

    /// File name suggested to clients downloading an archive.
    #[serde(default = "default_archive_file_name")]
    pub archive_file_name: String,

    /// Per-subscriber event buffer. Slower subscribers lose the oldest events.
    #[serde(default = "default_progress_buffer")]
    pub progress_buffer: usize,
}

fn default_downloads_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_retention_ms() -> u64 {
    3_600_000 // 1 hour
}

fn default_download_url_prefix() -> String {
    "/api/v1/sessions".to_string()
}

fn default_archive_file_name() -> String {
    "spotify_playlist.zip".to_string()
}

fn default_progress_buffer() -> usize {
    DEFAULT_PROGRESS_BUFFER
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            downloads_dir: default_downloads_dir(),
            retention_ms: default_retention_ms(),
            download_url_prefix: default_download_url_prefix(),
            archive_file_name: default_archive_file_name(),
            progress_buffer: default_progress_buffer(),
        }
    }
}

impl OrchestratorConfig {
    /// Retrieval reference for a completed session.
    pub fn download_url(&self, session_id: &str) -> String {
        format!(
            "{}/{}/download",
            self.download_url_prefix.trim_end_matches('/'),
            session_id
        )
    }

    /// Working directory of a session.
    pub fn session_dir(&self, session_id: &str) -> PathBuf {
        self.downloads_dir.join(session_id)
    }

    /// Archive location of a session.
    pub fn artifact_path(&self, session_id: &str) -> PathBuf {
        self.downloads_dir.join(format!("{}.zip", session_id))
    }
}
