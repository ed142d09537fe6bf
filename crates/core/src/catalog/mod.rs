//! Playlist metadata providers.
//!
//! A provider turns a playlist identity into an ordered list of track
//! descriptors. [`TrackResolver`] wraps a provider and normalises what it
//! returns for the rest of the pipeline.

mod resolver;
mod spotify;
mod types;

pub use resolver::{playlist_id_from_reference, ResolveError, TrackResolver};
pub use spotify::{SpotifyClient, SpotifyConfig};
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to a metadata provider.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Authentication against the provider failed.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// Playlist not found (404).
    #[error("Playlist not found: {0}")]
    NotFound(String),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Provider credentials are missing.
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// Source of playlist track lists.
#[async_trait]
pub trait PlaylistProvider: Send + Sync {
    /// Provider name, used in logs.
    fn name(&self) -> &str;

    /// Whether the provider has the credentials it needs.
    ///
    /// Checked before a session is created so unconfigured deployments fail
    /// fast instead of producing a failed session.
    fn is_configured(&self) -> bool;

    /// Fetch every entry of a playlist in provider order.
    ///
    /// Entries the provider cannot describe (removed or local-only tracks)
    /// come back as `None`.
    async fn playlist_tracks(
        &self,
        playlist_id: &str,
    ) -> Result<Vec<Option<TrackDescriptor>>, CatalogError>;
}
