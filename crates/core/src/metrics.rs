//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Sessions (started, finished, active, duration)
//! - Per-track processing
//! - External services (Spotify, yt-dlp)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Sessions
// =============================================================================

/// Sessions started total.
pub static SESSIONS_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("mixtape_sessions_started_total", "Total sessions started").unwrap()
});

/// Sessions that reached a terminal state, by result.
pub static SESSIONS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mixtape_sessions_finished_total",
            "Total sessions that reached a terminal state",
        ),
        &["result"], // "complete", "failed"
    )
    .unwrap()
});

/// Sessions currently starting or running.
pub static SESSIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("mixtape_sessions_active", "Sessions not yet terminal").unwrap()
});

/// Session duration in seconds.
pub static SESSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("mixtape_session_duration_seconds", "Duration of sessions").buckets(
            vec![1.0, 10.0, 30.0, 60.0, 300.0, 600.0, 1800.0, 3600.0, 7200.0],
        ),
        &["result"],
    )
    .unwrap()
});

/// Sessions reaped after the retention window.
pub static SESSIONS_CLEANED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mixtape_sessions_cleaned_total",
        "Total sessions removed after retention",
    )
    .unwrap()
});

// =============================================================================
// Tracks
// =============================================================================

/// Track attempts by result.
pub static TRACKS_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mixtape_tracks_processed_total", "Total track attempts"),
        &["result"], // "downloaded", "skipped"
    )
    .unwrap()
});

/// Tolerated tagging and cover failures.
pub static TRACK_ENRICHMENT_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mixtape_track_enrichment_failures_total",
            "Cover or tag failures that left a track untagged",
        ),
        &["stage"], // "cover", "tag"
    )
    .unwrap()
});

// =============================================================================
// External services
// =============================================================================

/// External service call duration.
pub static EXTERNAL_SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mixtape_external_service_duration_seconds",
            "Duration of external service calls",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0]),
        &["service"], // "playlist", "audio"
    )
    .unwrap()
});

/// Returns all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Sessions
        Box::new(SESSIONS_STARTED.clone()),
        Box::new(SESSIONS_FINISHED.clone()),
        Box::new(SESSIONS_ACTIVE.clone()),
        Box::new(SESSION_DURATION.clone()),
        Box::new(SESSIONS_CLEANED.clone()),
        // Tracks
        Box::new(TRACKS_PROCESSED.clone()),
        Box::new(TRACK_ENRICHMENT_FAILURES.clone()),
        // External services
        Box::new(EXTERNAL_SERVICE_DURATION.clone()),
    ]
}
