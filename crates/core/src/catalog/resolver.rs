use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use super::{CatalogError, PlaylistProvider, TrackDescriptor};

/// Errors from resolving a playlist reference into tracks.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No playlist identity could be extracted from the reference.
    #[error("Invalid playlist reference: {0}")]
    InvalidReference(String),

    /// The provider call failed. The whole list is rejected.
    #[error("Error fetching playlist: {0}")]
    Provider(#[from] CatalogError),
}

/// Extract the playlist identity from a URL or URI.
///
/// Accepts `https://open.spotify.com/playlist/<id>?si=...`, the same with
/// trailing slashes, `spotify:playlist:<id>` URIs and bare ids. Ids are
/// ASCII alphanumeric; anything else is rejected before it reaches a URL path.
pub fn playlist_id_from_reference(reference: &str) -> Option<String> {
    let trimmed = reference.trim();
    let without_query = trimmed.split(['?', '#']).next().unwrap_or_default();
    let without_slash = without_query.trim_end_matches('/');

    let id = if without_slash.starts_with("spotify:") {
        without_slash.rsplit(':').next()
    } else {
        without_slash.rsplit('/').next()
    }?;

    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        None
    } else {
        Some(id.to_string())
    }
}

/// Resolves playlist references to ordered track descriptors.
pub struct TrackResolver {
    provider: Arc<dyn PlaylistProvider>,
}

impl TrackResolver {
    pub fn new(provider: Arc<dyn PlaylistProvider>) -> Self {
        Self { provider }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_configured()
    }

    /// Fetch the playlist once and drop entries the provider could not describe.
    ///
    /// Provider order is preserved.
    pub async fn resolve(&self, reference: &str) -> Result<Vec<TrackDescriptor>, ResolveError> {
        let playlist_id = playlist_id_from_reference(reference)
            .ok_or_else(|| ResolveError::InvalidReference(reference.to_string()))?;

        debug!(
            "Resolving playlist {} via {}",
            playlist_id,
            self.provider.name()
        );

        let entries = self.provider.playlist_tracks(&playlist_id).await?;
        let total = entries.len();
        let tracks: Vec<TrackDescriptor> = entries.into_iter().flatten().collect();

        if tracks.len() < total {
            debug!(
                "Dropped {} unusable entries from playlist {}",
                total - tracks.len(),
                playlist_id
            );
        }
        info!("Resolved playlist {} to {} tracks", playlist_id, tracks.len());

        Ok(tracks)
    }
}
