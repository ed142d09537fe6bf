use serde::{Deserialize, Serialize};

/// Progress notification for one session.
///
/// Serialized with a `status` tag, e.g.
/// `{"status":"progress","session_id":"..","completed":1,"total":3,"percentage":33}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A track download is starting.
    Downloading {
        session_id: String,
        /// The search query, `"{artist} - {title}"`.
        current_track: String,
    },
    /// The playlist was resolved.
    Started {
        session_id: String,
        total_tracks: u32,
    },
    /// One track attempt finished, successfully or not.
    #[serde(rename = "progress")]
    TrackProgress {
        session_id: String,
        completed: u32,
        total: u32,
        percentage: u32,
    },
    /// A track was skipped or the session failed.
    Error { session_id: String, message: String },
    /// The archive is ready.
    Complete {
        session_id: String,
        download_url: String,
    },
}

impl ProgressEvent {
    pub fn session_id(&self) -> &str {
        match self {
            Self::Downloading { session_id, .. }
            | Self::Started { session_id, .. }
            | Self::TrackProgress { session_id, .. }
            | Self::Error { session_id, .. }
            | Self::Complete { session_id, .. } => session_id,
        }
    }

    /// The wire value of the `status` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Downloading { .. } => "downloading",
            Self::Started { .. } => "started",
            Self::TrackProgress { .. } => "progress",
            Self::Error { .. } => "error",
            Self::Complete { .. } => "complete",
        }
    }
}
