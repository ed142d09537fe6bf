//! Per-track pipeline: fetch audio, fetch cover, write tags, clean up.

mod track;

pub use track::{sanitize_file_name, TrackOutcome, TrackProcessor};
