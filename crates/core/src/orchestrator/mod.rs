//! Session orchestrator.
//!
//! Drives each download session through its lifecycle in a background task:
//! - **Resolve**: one provider call for the playlist
//! - **Tracks**: sequential, one [`TrackProcessor`](crate::processor::TrackProcessor) run per track
//! - **Package**: archive the session directory
//! - **Retention**: deferred cleanup of the session and its archive

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::SessionOrchestrator;
pub use types::OrchestratorError;
