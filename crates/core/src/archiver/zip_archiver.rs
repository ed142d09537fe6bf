use async_trait::async_trait;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{ArchiveError, Archiver};

/// Deflate-compressed zip archiver.
#[derive(Debug, Default, Clone)]
pub struct ZipArchiver;

impl ZipArchiver {
    pub fn new() -> Self {
        Self
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// Collect `(entry_name, path)` pairs sorted by entry name.
fn collect_entries(
    source_dir: &Path,
    extension: &str,
) -> Result<Vec<(String, PathBuf)>, ArchiveError> {
    let root = source_dir
        .parent()
        .ok_or_else(|| ArchiveError::InvalidSource {
            path: source_dir.to_path_buf(),
        })?;

    let mut entries = Vec::new();
    for entry in WalkDir::new(source_dir) {
        let entry = entry?;
        if !entry.file_type().is_file() || !has_extension(entry.path(), extension) {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        // Zip entry names always use forward slashes
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        entries.push((name, entry.into_path()));
    }

    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

fn archive_blocking(source_dir: &Path, dest: &Path, extension: &str) -> Result<usize, ArchiveError> {
    let entries = collect_entries(source_dir, extension)?;

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = ZipWriter::new(BufWriter::new(File::create(dest)?));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, path) in &entries {
        writer.start_file(name.as_str(), options)?;
        let mut file = File::open(path)?;
        std::io::copy(&mut file, &mut writer)?;
    }

    writer.finish()?.flush()?;
    Ok(entries.len())
}

#[async_trait]
impl Archiver for ZipArchiver {
    async fn archive(
        &self,
        source_dir: &Path,
        dest: &Path,
        extension: &str,
    ) -> Result<usize, ArchiveError> {
        let source_dir = source_dir.to_path_buf();
        let dest = dest.to_path_buf();
        let extension = extension.to_string();

        let count = tokio::task::spawn_blocking(move || {
            archive_blocking(&source_dir, &dest, &extension)
        })
        .await
        .map_err(|e| ArchiveError::TaskFailed(e.to_string()))??;

        debug!("Archived {} entries", count);
        Ok(count)
    }
}
