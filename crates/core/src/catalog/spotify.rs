//! Spotify Web API client.
//!
//! Uses the client-credentials flow: no user login, only public playlists.
//! The access token is cached and refreshed shortly before it expires.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::types::{parse_release_year, TrackDescriptor};
use super::{CatalogError, PlaylistProvider};

/// Refresh the token this long before Spotify says it expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Spotify's maximum page size for playlist items.
const PAGE_LIMIT: &str = "100";

/// Spotify API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    /// Application client id.
    #[serde(default)]
    pub client_id: String,
    /// Application client secret.
    #[serde(default)]
    pub client_secret: String,
    /// Web API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Token endpoint for the client-credentials flow.
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_base() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_auth_url() -> String {
    "https://accounts.spotify.com/api/token".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            api_base: default_api_base(),
            auth_url: default_auth_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SpotifyConfig {
    /// Both halves of the client credentials are present.
    pub fn has_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Spotify API client.
pub struct SpotifyClient {
    client: Client,
    config: SpotifyConfig,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyClient {
    /// Create a new Spotify client.
    ///
    /// Missing credentials are not an error here; they are reported through
    /// [`PlaylistProvider::is_configured`] so the server can still start.
    pub fn new(config: SpotifyConfig) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config,
            token: Mutex::new(None),
        })
    }

    /// Get a valid access token, requesting a new one when needed.
    async fn access_token(&self) -> Result<String, CatalogError> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.access_token.clone());
            }
        }

        debug!("Requesting Spotify access token");

        let response = self
            .client
            .post(&self.config.auth_url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Spotify token request rejected: {} {}", status, body);
            return Err(CatalogError::AuthFailed(format!("{} - {}", status.as_u16(), body)));
        }

        let token: SpTokenResponse = response.json().await.map_err(|e| {
            CatalogError::ParseError(format!("Failed to parse token response: {}", e))
        })?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }

    async fn fetch_page(&self, url: &str, first: bool) -> Result<SpPage, CatalogError> {
        let token = self.access_token().await?;

        let mut request = self.client.get(url).bearer_auth(token);
        if first {
            request = request.query(&[("limit", PAGE_LIMIT)]);
        }

        let response = request.send().await?;

        let status = response.status();
        if status == 404 {
            return Err(CatalogError::NotFound(url.to_string()));
        }
        if status == 401 {
            // Drop the cached token so the next session re-authenticates.
            *self.token.lock().await = None;
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| CatalogError::ParseError(format!("Failed to parse playlist page: {}", e)))
    }
}

#[async_trait]
impl PlaylistProvider for SpotifyClient {
    fn name(&self) -> &str {
        "spotify"
    }

    fn is_configured(&self) -> bool {
        self.config.has_credentials()
    }

    async fn playlist_tracks(
        &self,
        playlist_id: &str,
    ) -> Result<Vec<Option<TrackDescriptor>>, CatalogError> {
        if !self.is_configured() {
            return Err(CatalogError::NotConfigured(
                "Spotify API credentials not configured".to_string(),
            ));
        }

        let mut url = format!(
            "{}/playlists/{}/tracks",
            self.config.api_base.trim_end_matches('/'),
            playlist_id
        );
        let mut first = true;
        let mut tracks = Vec::new();

        loop {
            debug!("Spotify playlist page: {}", url);
            let page = self.fetch_page(&url, first).await?;
            first = false;

            tracks.extend(page.items.into_iter().map(SpItem::into_descriptor));

            match page.next {
                Some(next) if !next.is_empty() => url = next,
                _ => break,
            }
        }

        debug!(
            "Spotify playlist {} returned {} entries",
            playlist_id,
            tracks.len()
        );

        Ok(tracks)
    }
}

// ============================================================================
// Spotify API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct SpTokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Deserialize)]
struct SpPage {
    #[serde(default)]
    items: Vec<SpItem>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpItem {
    #[serde(default)]
    track: Option<SpTrack>,
}

#[derive(Debug, Deserialize)]
struct SpTrack {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    artists: Vec<SpArtist>,
    #[serde(default)]
    album: Option<SpAlbum>,
}

#[derive(Debug, Deserialize)]
struct SpArtist {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpAlbum {
    #[serde(default)]
    name: String,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    images: Vec<SpImage>,
}

#[derive(Debug, Deserialize)]
struct SpImage {
    url: String,
}

impl SpItem {
    fn into_descriptor(self) -> Option<TrackDescriptor> {
        let track = self.track?;
        let title = track.name.filter(|n| !n.trim().is_empty())?;
        let artist = track
            .artists
            .into_iter()
            .map(|a| a.name)
            .find(|n| !n.trim().is_empty())?;

        let (album, release_year, cover_url) = match track.album {
            Some(album) => (
                album.name,
                album.release_date.as_deref().and_then(parse_release_year),
                album.images.into_iter().next().map(|i| i.url),
            ),
            None => (String::new(), None, None),
        };

        Some(TrackDescriptor {
            title,
            artist,
            album,
            release_year,
            cover_url,
        })
    }
}
