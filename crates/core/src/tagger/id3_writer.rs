use async_trait::async_trait;
use id3::frame::{Picture, PictureType};
use id3::{ErrorKind, Tag, TagLike, Version};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{TagError, TagWriter};
use crate::catalog::TrackDescriptor;

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

/// ID3v2.3 tag writer.
///
/// Existing frames are preserved; title, artist, album, year and the front
/// cover are replaced.
#[derive(Debug, Default, Clone)]
pub struct Id3TagWriter;

impl Id3TagWriter {
    pub fn new() -> Self {
        Self
    }
}

fn image_mime_type(data: &[u8]) -> &'static str {
    if data.starts_with(PNG_MAGIC) {
        "image/png"
    } else {
        "image/jpeg"
    }
}

fn read_or_new(path: &Path) -> Result<Tag, TagError> {
    match Tag::read_from_path(path) {
        Ok(tag) => Ok(tag),
        Err(e) if matches!(e.kind, ErrorKind::NoTag) => Ok(Tag::new()),
        Err(e) => match e.partial_tag {
            Some(tag) => Ok(tag),
            None => Err(TagError::ReadFailed {
                path: path.to_path_buf(),
                reason: e.description,
            }),
        },
    }
}

fn write_blocking(
    audio_path: PathBuf,
    track: TrackDescriptor,
    cover: Option<Vec<u8>>,
) -> Result<(), TagError> {
    let mut tag = read_or_new(&audio_path)?;

    tag.set_title(track.title);
    tag.set_artist(track.artist);
    tag.set_album(track.album);
    if let Some(year) = track.release_year {
        tag.set_year(year);
    }

    if let Some(data) = cover {
        tag.remove_picture_by_type(PictureType::CoverFront);
        tag.add_frame(Picture {
            mime_type: image_mime_type(&data).to_string(),
            picture_type: PictureType::CoverFront,
            description: "Cover".to_string(),
            data,
        });
    }

    tag.write_to_path(&audio_path, Version::Id3v23)
        .map_err(|e| TagError::WriteFailed {
            path: audio_path.clone(),
            reason: e.description,
        })
}

#[async_trait]
impl TagWriter for Id3TagWriter {
    async fn write_tags(
        &self,
        audio_path: &Path,
        track: &TrackDescriptor,
        cover_path: Option<&Path>,
    ) -> Result<(), TagError> {
        let cover = match cover_path {
            Some(p) => Some(tokio::fs::read(p).await.map_err(TagError::Cover)?),
            None => None,
        };

        debug!(
            "Tagging {:?} (cover: {})",
            audio_path,
            cover.as_ref().map(|c| c.len()).unwrap_or(0)
        );

        let audio_path = audio_path.to_path_buf();
        let track = track.clone();
        tokio::task::spawn_blocking(move || write_blocking(audio_path, track, cover))
            .await
            .map_err(|e| TagError::TaskFailed(e.to_string()))?
    }
}
