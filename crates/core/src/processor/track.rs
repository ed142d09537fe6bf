use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::catalog::TrackDescriptor;
use crate::fetcher::{CoverFetcher, MediaFetcher};
use crate::metrics;
use crate::progress::ProgressPublisher;
use crate::tagger::TagWriter;

static ILLEGAL_FILE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[\\/*?:"<>|]"#).unwrap());

/// Strip characters that are not allowed in file names on common filesystems.
pub fn sanitize_file_name(name: &str) -> String {
    ILLEGAL_FILE_CHARS.replace_all(name, "").into_owned()
}

/// Result of one track attempt. A skip is not an error: the session goes on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    Downloaded(PathBuf),
    Skipped { reason: String },
}

impl TrackOutcome {
    pub fn is_downloaded(&self) -> bool {
        matches!(self, Self::Downloaded(_))
    }
}

/// Removes a file when dropped.
struct TempFileGuard {
    path: PathBuf,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed temporary file {:?}", self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove temporary file {:?}: {}", self.path, e),
        }
    }
}

/// Runs the per-track pipeline against the configured collaborators.
pub struct TrackProcessor {
    fetcher: Arc<dyn MediaFetcher>,
    covers: Arc<dyn CoverFetcher>,
    tagger: Arc<dyn TagWriter>,
}

impl TrackProcessor {
    pub fn new(
        fetcher: Arc<dyn MediaFetcher>,
        covers: Arc<dyn CoverFetcher>,
        tagger: Arc<dyn TagWriter>,
    ) -> Self {
        Self {
            fetcher,
            covers,
            tagger,
        }
    }

    /// Extension of the audio files this processor produces.
    pub fn audio_extension(&self) -> &str {
        self.fetcher.output_extension()
    }

    /// Process one track into `output_dir`.
    ///
    /// Emits a downloading notice before the fetch and an error notice if the
    /// fetch fails. Cover and tag failures are logged and leave the audio
    /// file untagged.
    pub async fn process(
        &self,
        track: &TrackDescriptor,
        index: usize,
        output_dir: &Path,
        progress: &ProgressPublisher,
    ) -> TrackOutcome {
        let query = track.search_query();
        let output_base = output_dir.join(sanitize_file_name(&query));

        progress.downloading(&query);

        let start = Instant::now();
        let fetched = self.fetcher.fetch(&query, &output_base).await;
        metrics::EXTERNAL_SERVICE_DURATION
            .with_label_values(&["audio"])
            .observe(start.elapsed().as_secs_f64());

        let audio_path = match fetched {
            Ok(path) => path,
            Err(e) => {
                let message = format!("Error downloading {}: {}", query, e);
                warn!("[{}] {}", progress.session_id(), message);
                progress.error(message.clone());
                metrics::TRACKS_PROCESSED
                    .with_label_values(&["skipped"])
                    .inc();
                return TrackOutcome::Skipped { reason: message };
            }
        };

        let cover_guard = TempFileGuard::new(output_dir.join(format!("temp_cover_{}.jpg", index)));

        let cover_path = match self
            .covers
            .fetch(track.cover_url.as_deref(), cover_guard.path())
            .await
        {
            Ok(path) => path,
            Err(e) => {
                warn!("[{}] Cover for '{}' unavailable: {}", progress.session_id(), query, e);
                metrics::TRACK_ENRICHMENT_FAILURES
                    .with_label_values(&["cover"])
                    .inc();
                None
            }
        };

        if let Err(e) = self
            .tagger
            .write_tags(&audio_path, track, cover_path.as_deref())
            .await
        {
            warn!("[{}] Tagging '{}' failed: {}", progress.session_id(), query, e);
            metrics::TRACK_ENRICHMENT_FAILURES
                .with_label_values(&["tag"])
                .inc();
        }

        drop(cover_guard);

        debug!("[{}] Downloaded {:?}", progress.session_id(), audio_path);
        metrics::TRACKS_PROCESSED
            .with_label_values(&["downloaded"])
            .inc();

        TrackOutcome::Downloaded(audio_path)
    }
}
