//! Download sessions and the registry that tracks them.

mod registry;
mod types;

pub use registry::SessionRegistry;
pub use types::{percentage, Session, SessionStatus};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Invalid transition for session {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error("Session {id} is {status}, not running")]
    NotRunning { id: String, status: SessionStatus },

    #[error("Session {id} already completed all {total} tracks")]
    CounterOverflow { id: String, total: u32 },
}
