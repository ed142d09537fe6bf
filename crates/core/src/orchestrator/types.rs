//! Types for the session orchestrator.

use thiserror::Error;

/// Errors that can occur during orchestration.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The request did not carry a usable playlist reference.
    #[error("{0}")]
    InvalidReference(String),

    /// The metadata provider has no credentials.
    #[error("{0}")]
    ProviderNotConfigured(String),

    /// The orchestrator no longer accepts sessions.
    #[error("orchestrator is shutting down")]
    ShuttingDown,

    /// Session not found (never existed or already reaped).
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// The session has no archive to hand out.
    #[error("session {0} is not complete")]
    NotComplete(String),

    /// The session completed but its archive is gone from disk.
    #[error("archive missing for session {0}")]
    ArtifactMissing(String),

    /// Playlist resolution failed.
    #[error(transparent)]
    Resolution(#[from] crate::catalog::ResolveError),

    /// Packaging failed.
    #[error("Error creating archive: {0}")]
    Packaging(#[from] crate::archiver::ArchiveError),

    /// Session bookkeeping error.
    #[error("session error: {0}")]
    Session(#[from] crate::session::SessionError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
