use serde::{Deserialize, Serialize};

/// Descriptive metadata for one playlist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    pub title: String,
    /// Primary artist.
    pub artist: String,
    pub album: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_year: Option<i32>,
    /// URL of the album cover image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
}

impl TrackDescriptor {
    /// Search query used to locate the audio, `"{artist} - {title}"`.
    pub fn search_query(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }
}

/// Extract the year from a `YYYY`, `YYYY-MM` or `YYYY-MM-DD` release date.
pub fn parse_release_year(date: &str) -> Option<i32> {
    let year = date.get(..4)?;
    if !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    year.parse().ok()
}
