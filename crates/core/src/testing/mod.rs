//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of every collaborator trait, so
//! the orchestrator can be exercised end to end without Spotify, yt-dlp or
//! network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use mixtape_core::testing::{fixtures, MockMediaFetcher, MockPlaylistProvider};
//!
//! let provider = MockPlaylistProvider::new();
//! provider.set_tracks("pl", fixtures::tracks(3)).await;
//!
//! let fetcher = MockMediaFetcher::new();
//! fetcher.fail_query("Artist 2 - Song 2").await;
//! ```

mod mock_archiver;
mod mock_cover_fetcher;
mod mock_media_fetcher;
mod mock_playlist_provider;
mod mock_tag_writer;

pub use mock_archiver::MockArchiver;
pub use mock_cover_fetcher::MockCoverFetcher;
pub use mock_media_fetcher::MockMediaFetcher;
pub use mock_playlist_provider::MockPlaylistProvider;
pub use mock_tag_writer::{MockTagWriter, RecordedTagWrite};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::catalog::TrackDescriptor;

    /// Create a test track with reasonable defaults.
    pub fn track(artist: &str, title: &str) -> TrackDescriptor {
        TrackDescriptor {
            title: title.to_string(),
            artist: artist.to_string(),
            album: "Album".to_string(),
            release_year: None,
            cover_url: None,
        }
    }

    /// Create a test track that carries a cover URL and release year.
    pub fn track_with_cover(artist: &str, title: &str) -> TrackDescriptor {
        TrackDescriptor {
            release_year: Some(2020),
            cover_url: Some(format!(
                "https://covers.test/{}.jpg",
                artist.to_lowercase().replace(' ', "-")
            )),
            ..track(artist, title)
        }
    }

    /// `n` tracks named `Artist {i}` / `Song {i}`, starting at 1.
    pub fn tracks(n: usize) -> Vec<TrackDescriptor> {
        (1..=n)
            .map(|i| track_with_cover(&format!("Artist {}", i), &format!("Song {}", i)))
            .collect()
    }

    /// Search query the processor will issue for track `i` of [`tracks`].
    pub fn query(i: usize) -> String {
        format!("Artist {} - Song {}", i, i)
    }

    /// A shareable playlist URL for `id`.
    pub fn playlist_url(id: &str) -> String {
        format!("https://open.spotify.com/playlist/{}?si=test", id)
    }
}
