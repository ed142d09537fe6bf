//! Session record and its lifecycle rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::SessionError;

/// Lifecycle state of a download session.
///
/// `Starting -> Running -> {Complete, Failed}`, or `Starting -> Failed` when
/// the playlist cannot be resolved. Terminal states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Starting,
    Running,
    Complete,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One playlist download job.
///
/// Only the owning orchestrator task mutates a session; readers get clones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub status: SessionStatus,
    pub source_reference: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_count: u32,
    pub total_count: u32,
    /// Set iff `status == Complete`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<PathBuf>,
    /// Set iff `status == Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl Session {
    /// Create a session in `Starting` with a fresh v4 identity.
    pub fn new(source_reference: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            status: SessionStatus::Starting,
            source_reference: source_reference.into(),
            created_at: Utc::now(),
            completed_at: None,
            completed_count: 0,
            total_count: 0,
            artifact_path: None,
            error_detail: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Completed share of the playlist, floored. Zero for an empty playlist.
    pub fn percentage(&self) -> u32 {
        percentage(self.completed_count, self.total_count)
    }

    fn transition_error(&self, to: SessionStatus) -> SessionError {
        SessionError::InvalidTransition {
            id: self.id.clone(),
            from: self.status,
            to,
        }
    }

    /// `Starting -> Running` once the track list is known.
    pub fn start_running(&mut self, total: u32) -> Result<(), SessionError> {
        if self.status != SessionStatus::Starting {
            return Err(self.transition_error(SessionStatus::Running));
        }
        self.status = SessionStatus::Running;
        self.total_count = total;
        self.completed_count = 0;
        Ok(())
    }

    /// Count one successfully processed track.
    pub fn record_success(&mut self) -> Result<u32, SessionError> {
        if self.status != SessionStatus::Running {
            return Err(SessionError::NotRunning {
                id: self.id.clone(),
                status: self.status,
            });
        }
        if self.completed_count >= self.total_count {
            return Err(SessionError::CounterOverflow {
                id: self.id.clone(),
                total: self.total_count,
            });
        }
        self.completed_count += 1;
        Ok(self.completed_count)
    }

    /// `Running -> Complete` with the packaged artifact.
    pub fn complete(&mut self, artifact_path: PathBuf) -> Result<(), SessionError> {
        if self.status != SessionStatus::Running {
            return Err(self.transition_error(SessionStatus::Complete));
        }
        self.status = SessionStatus::Complete;
        self.artifact_path = Some(artifact_path);
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// `Starting | Running -> Failed`.
    pub fn fail(&mut self, detail: impl Into<String>) -> Result<(), SessionError> {
        if self.is_terminal() {
            return Err(self.transition_error(SessionStatus::Failed));
        }
        self.status = SessionStatus::Failed;
        self.error_detail = Some(detail.into());
        self.completed_at = Some(Utc::now());
        Ok(())
    }
}

/// `floor(completed / total * 100)`, zero when `total` is zero.
pub fn percentage(completed: u32, total: u32) -> u32 {
    if total == 0 {
        0
    } else {
        ((completed as u64 * 100) / total as u64) as u32
    }
}
