//! Mock playlist provider for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::catalog::{CatalogError, PlaylistProvider, TrackDescriptor};

/// Mock implementation of the PlaylistProvider trait.
///
/// Unknown playlist ids return [`CatalogError::NotFound`].
#[derive(Debug)]
pub struct MockPlaylistProvider {
    playlists: Arc<RwLock<HashMap<String, Vec<Option<TrackDescriptor>>>>>,
    requests: Arc<RwLock<Vec<String>>>,
    next_error: Arc<RwLock<Option<CatalogError>>>,
    delay_ms: Arc<RwLock<u64>>,
    configured: AtomicBool,
}

impl Default for MockPlaylistProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPlaylistProvider {
    pub fn new() -> Self {
        Self {
            playlists: Arc::new(RwLock::new(HashMap::new())),
            requests: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            delay_ms: Arc::new(RwLock::new(0)),
            configured: AtomicBool::new(true),
        }
    }

    /// Set the raw entries for a playlist, including missing ones.
    pub async fn set_playlist(&self, playlist_id: &str, entries: Vec<Option<TrackDescriptor>>) {
        self.playlists
            .write()
            .await
            .insert(playlist_id.to_string(), entries);
    }

    /// Set the tracks for a playlist.
    pub async fn set_tracks(&self, playlist_id: &str, tracks: Vec<TrackDescriptor>) {
        self.set_playlist(playlist_id, tracks.into_iter().map(Some).collect())
            .await;
    }

    /// Configure the next request to fail with the given error.
    pub async fn set_next_error(&self, error: CatalogError) {
        *self.next_error.write().await = Some(error);
    }

    /// Delay every request, to observe sessions before they leave `Starting`.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay_ms.write().await = delay.as_millis() as u64;
    }

    pub fn set_configured(&self, configured: bool) {
        self.configured.store(configured, Ordering::SeqCst);
    }

    /// Playlist ids requested so far, in order.
    pub async fn recorded_requests(&self) -> Vec<String> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl PlaylistProvider for MockPlaylistProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn is_configured(&self) -> bool {
        self.configured.load(Ordering::SeqCst)
    }

    async fn playlist_tracks(
        &self,
        playlist_id: &str,
    ) -> Result<Vec<Option<TrackDescriptor>>, CatalogError> {
        self.requests.write().await.push(playlist_id.to_string());

        let delay = *self.delay_ms.read().await;
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        self.playlists
            .read()
            .await
            .get(playlist_id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(playlist_id.to_string()))
    }
}
