//! Session lifecycle integration tests.
//!
//! These tests drive sessions through the orchestrator with mock
//! collaborators and the real zip archiver:
//! starting -> running -> complete | failed -> reaped

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::broadcast;

use mixtape_core::{
    testing::{
        fixtures, MockArchiver, MockCoverFetcher, MockMediaFetcher, MockPlaylistProvider,
        MockTagWriter,
    },
    CatalogError, OrchestratorConfig, OrchestratorError, ProgressEvent, Session,
    SessionOrchestrator, SessionStatus, TrackProcessor, TrackResolver,
};

/// Test helper to create all dependencies for orchestrator testing.
struct TestHarness {
    provider: Arc<MockPlaylistProvider>,
    fetcher: Arc<MockMediaFetcher>,
    covers: Arc<MockCoverFetcher>,
    tagger: Arc<MockTagWriter>,
    archiver: Arc<MockArchiver>,
    temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        Self {
            provider: Arc::new(MockPlaylistProvider::new()),
            fetcher: Arc::new(MockMediaFetcher::new()),
            covers: Arc::new(MockCoverFetcher::new()),
            tagger: Arc::new(MockTagWriter::new()),
            archiver: Arc::new(MockArchiver::new()),
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    fn create_orchestrator(&self, retention_ms: u64) -> SessionOrchestrator {
        let config = OrchestratorConfig {
            downloads_dir: self.temp_dir.path().to_path_buf(),
            retention_ms,
            ..Default::default()
        };

        let processor = TrackProcessor::new(
            Arc::clone(&self.fetcher) as Arc<dyn mixtape_core::MediaFetcher>,
            Arc::clone(&self.covers) as Arc<dyn mixtape_core::CoverFetcher>,
            Arc::clone(&self.tagger) as Arc<dyn mixtape_core::TagWriter>,
        );

        SessionOrchestrator::new(
            config,
            TrackResolver::new(Arc::clone(&self.provider) as Arc<dyn mixtape_core::PlaylistProvider>),
            processor,
            Arc::clone(&self.archiver) as Arc<dyn mixtape_core::Archiver>,
        )
    }

    async fn wait_for_terminal(
        orchestrator: &SessionOrchestrator,
        session_id: &str,
        timeout: Duration,
    ) -> Option<Session> {
        let start = std::time::Instant::now();
        let poll_interval = Duration::from_millis(20);

        while start.elapsed() < timeout {
            if let Some(session) = orchestrator.get_session(session_id).await {
                if session.status.is_terminal() {
                    return Some(session);
                }
            }
            tokio::time::sleep(poll_interval).await;
        }
        None
    }

    async fn wait_for_removal(
        orchestrator: &SessionOrchestrator,
        session_id: &str,
        timeout: Duration,
    ) -> bool {
        let start = std::time::Instant::now();
        while start.elapsed() < timeout {
            if orchestrator.get_session(session_id).await.is_none() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }
}

/// Drain the firehose for one session until its terminal event.
async fn collect_events(
    rx: &mut broadcast::Receiver<ProgressEvent>,
    session_id: &str,
) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    let result = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.expect("firehose closed");
            if event.session_id() != session_id {
                continue;
            }
            let done = matches!(event, ProgressEvent::Complete { .. })
                || (matches!(event, ProgressEvent::Error { .. }) && events.is_empty());
            events.push(event);
            if done {
                break;
            }
        }
    })
    .await;
    assert!(result.is_ok(), "timed out waiting for events: {:?}", events);
    events
}

/// Everything already buffered on the firehose for one session.
fn drain_events(
    rx: &mut broadcast::Receiver<ProgressEvent>,
    session_id: &str,
) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if event.session_id() == session_id {
            events.push(event);
        }
    }
    events
}

fn zip_entries(path: &std::path::Path) -> Vec<String> {
    let file = std::fs::File::open(path).expect("archive exists");
    let archive = zip::ZipArchive::new(file).expect("valid zip");
    archive.file_names().map(str::to_string).collect()
}

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn test_session_completes_with_all_tracks() {
    let harness = TestHarness::new();
    harness.provider.set_tracks("pl", fixtures::tracks(4)).await;
    let orchestrator = harness.create_orchestrator(60_000);

    let id = orchestrator
        .start(&fixtures::playlist_url("pl"))
        .await
        .expect("start");

    let session = TestHarness::wait_for_terminal(&orchestrator, &id, Duration::from_secs(5))
        .await
        .expect("session finished");

    assert_eq!(session.status, SessionStatus::Complete);
    assert_eq!(session.completed_count, 4);
    assert_eq!(session.total_count, 4);
    assert!(session.completed_at.is_some());
    assert!(session.error_detail.is_none());

    let artifact = orchestrator.artifact_path(&id).await.expect("artifact");
    let mut entries = zip_entries(&artifact);
    entries.sort();
    assert_eq!(entries.len(), 4);
    assert!(entries.iter().all(|e| e.ends_with(".mp3")));
    assert!(entries[0].ends_with("Artist 1 - Song 1.mp3"));

    // Temporary covers never reach the archive or survive the track
    let session_dir = harness.temp_dir.path().join(&id);
    let leftovers: Vec<_> = std::fs::read_dir(&session_dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with("temp_cover_"))
        .collect();
    assert!(leftovers.is_empty());

    // Every track was tagged with a cover present on disk
    let calls = harness.tagger.recorded_calls().await;
    assert_eq!(calls.len(), 4);
    assert!(calls.iter().all(|c| c.cover_existed));
    assert_eq!(harness.provider.recorded_requests().await, vec!["pl"]);
}

#[tokio::test]
async fn test_failed_tracks_are_skipped() {
    let harness = TestHarness::new();
    harness.provider.set_tracks("pl", fixtures::tracks(5)).await;
    harness.fetcher.fail_query(&fixtures::query(2)).await;
    harness.fetcher.fail_query(&fixtures::query(4)).await;
    let orchestrator = harness.create_orchestrator(60_000);

    let id = orchestrator.start(&fixtures::playlist_url("pl")).await.unwrap();
    let session = TestHarness::wait_for_terminal(&orchestrator, &id, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(session.status, SessionStatus::Complete);
    assert_eq!(session.completed_count, 3);
    assert_eq!(session.total_count, 5);
    assert_eq!(zip_entries(&orchestrator.artifact_path(&id).await.unwrap()).len(), 3);

    // Skipped tracks never reach the tagger
    assert_eq!(harness.tagger.recorded_calls().await.len(), 3);
    assert_eq!(harness.fetcher.recorded_queries().await.len(), 5);
}

#[tokio::test]
async fn test_all_tracks_failing_still_completes() {
    let harness = TestHarness::new();
    harness.provider.set_tracks("pl", fixtures::tracks(2)).await;
    harness.fetcher.fail_query(&fixtures::query(1)).await;
    harness.fetcher.fail_query(&fixtures::query(2)).await;
    let orchestrator = harness.create_orchestrator(60_000);

    let mut rx = orchestrator.progress().subscribe_all();
    let id = orchestrator.start(&fixtures::playlist_url("pl")).await.unwrap();
    let events = collect_events(&mut rx, &id).await;

    let session = TestHarness::wait_for_terminal(&orchestrator, &id, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(session.status, SessionStatus::Complete);
    assert_eq!(session.completed_count, 0);
    assert_eq!(session.total_count, 2);
    assert!(session.error_detail.is_none());

    let artifact = orchestrator.artifact_path(&id).await.expect("artifact");
    assert!(zip_entries(&artifact).is_empty());

    let progress: Vec<(u32, u32, u32)> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::TrackProgress {
                completed,
                total,
                percentage,
                ..
            } => Some((*completed, *total, *percentage)),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![(0, 2, 0), (0, 2, 0)]);
    assert!(matches!(events.last(), Some(ProgressEvent::Complete { .. })));
    assert!(harness.tagger.recorded_calls().await.is_empty());
}

#[tokio::test]
async fn test_progress_events_for_partial_failure() {
    let harness = TestHarness::new();
    harness.provider.set_tracks("pl", fixtures::tracks(3)).await;
    harness.fetcher.fail_query(&fixtures::query(2)).await;
    let orchestrator = harness.create_orchestrator(60_000);

    let mut rx = orchestrator.progress().subscribe_all();
    let id = orchestrator.start(&fixtures::playlist_url("pl")).await.unwrap();
    let events = collect_events(&mut rx, &id).await;

    let kinds: Vec<&str> = events.iter().map(ProgressEvent::kind).collect();
    assert_eq!(
        kinds,
        vec![
            "started",
            "downloading",
            "progress",
            "downloading",
            "error",
            "progress",
            "downloading",
            "progress",
            "complete",
        ]
    );

    let progress: Vec<(u32, u32, u32)> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::TrackProgress {
                completed,
                total,
                percentage,
                ..
            } => Some((*completed, *total, *percentage)),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![(1, 3, 33), (1, 3, 33), (2, 3, 66)]);

    assert_eq!(
        events[0],
        ProgressEvent::Started {
            session_id: id.clone(),
            total_tracks: 3
        }
    );
    assert_eq!(
        events[1],
        ProgressEvent::Downloading {
            session_id: id.clone(),
            current_track: fixtures::query(1)
        }
    );
    match &events[4] {
        ProgressEvent::Error { message, .. } => {
            assert!(message.starts_with(&format!("Error downloading {}", fixtures::query(2))));
        }
        other => panic!("expected error event, got {:?}", other),
    }
    assert_eq!(
        events.last(),
        Some(&ProgressEvent::Complete {
            session_id: id.clone(),
            download_url: format!("/api/v1/sessions/{}/download", id),
        })
    );

    let artifact = orchestrator.artifact_path(&id).await.unwrap();
    assert_eq!(zip_entries(&artifact).len(), 2);
}

#[tokio::test]
async fn test_empty_playlist_completes_with_empty_archive() {
    let harness = TestHarness::new();
    harness.provider.set_tracks("empty", vec![]).await;
    let orchestrator = harness.create_orchestrator(60_000);

    let mut rx = orchestrator.progress().subscribe_all();
    let id = orchestrator
        .start(&fixtures::playlist_url("empty"))
        .await
        .unwrap();
    let events = collect_events(&mut rx, &id).await;

    let kinds: Vec<&str> = events.iter().map(ProgressEvent::kind).collect();
    assert_eq!(kinds, vec!["started", "complete"]);

    let session = TestHarness::wait_for_terminal(&orchestrator, &id, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(session.status, SessionStatus::Complete);
    assert_eq!(session.total_count, 0);
    assert_eq!(session.percentage(), 0);
    assert!(zip_entries(&orchestrator.artifact_path(&id).await.unwrap()).is_empty());
}

#[tokio::test]
async fn test_unavailable_entries_are_dropped() {
    let harness = TestHarness::new();
    harness
        .provider
        .set_playlist(
            "pl",
            vec![
                Some(fixtures::track("A", "One")),
                None,
                Some(fixtures::track("B", "Two")),
            ],
        )
        .await;
    let orchestrator = harness.create_orchestrator(60_000);

    let id = orchestrator.start(&fixtures::playlist_url("pl")).await.unwrap();
    let session = TestHarness::wait_for_terminal(&orchestrator, &id, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(session.total_count, 2);
    assert_eq!(session.completed_count, 2);
    assert_eq!(
        harness.fetcher.recorded_queries().await,
        vec!["A - One", "B - Two"]
    );
    // No cover URL means no cover on the tag call
    assert!(harness
        .tagger
        .recorded_calls()
        .await
        .iter()
        .all(|c| c.cover_path.is_none()));
}

#[tokio::test]
async fn test_enrichment_failures_keep_the_track() {
    let harness = TestHarness::new();
    harness.provider.set_tracks("pl", fixtures::tracks(2)).await;
    harness.covers.set_fail(true).await;
    harness.tagger.set_fail(true).await;
    let orchestrator = harness.create_orchestrator(60_000);

    let id = orchestrator.start(&fixtures::playlist_url("pl")).await.unwrap();
    let session = TestHarness::wait_for_terminal(&orchestrator, &id, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(session.status, SessionStatus::Complete);
    assert_eq!(session.completed_count, 2);
    assert_eq!(zip_entries(&orchestrator.artifact_path(&id).await.unwrap()).len(), 2);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_resolution_failure_fails_session() {
    let harness = TestHarness::new();
    harness
        .provider
        .set_next_error(CatalogError::NotFound("missing".to_string()))
        .await;
    let orchestrator = harness.create_orchestrator(60_000);

    let mut rx = orchestrator.progress().subscribe_all();
    let id = orchestrator
        .start(&fixtures::playlist_url("missing"))
        .await
        .unwrap();
    let events = collect_events(&mut rx, &id).await;

    assert_eq!(events.len(), 1);
    let message = match &events[0] {
        ProgressEvent::Error { message, .. } => message.clone(),
        other => panic!("expected error event, got {:?}", other),
    };
    assert!(message.starts_with("Error fetching playlist"));

    let session = TestHarness::wait_for_terminal(&orchestrator, &id, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(session.status, SessionStatus::Failed);
    assert_eq!(session.error_detail.as_deref(), Some(message.as_str()));
    assert!(session.artifact_path.is_none());
    assert!(harness.fetcher.recorded_queries().await.is_empty());

    assert!(matches!(
        orchestrator.artifact_path(&id).await,
        Err(OrchestratorError::NotComplete(_))
    ));
}

#[tokio::test]
async fn test_packaging_failure_fails_session() {
    let harness = TestHarness::new();
    harness.provider.set_tracks("pl", fixtures::tracks(2)).await;
    harness.archiver.set_fail(true).await;
    let orchestrator = harness.create_orchestrator(60_000);

    let mut rx = orchestrator.progress().subscribe_all();
    let id = orchestrator.start(&fixtures::playlist_url("pl")).await.unwrap();

    let session = TestHarness::wait_for_terminal(&orchestrator, &id, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(session.status, SessionStatus::Failed);
    assert_eq!(session.completed_count, 2);
    assert!(session.artifact_path.is_none());
    let detail = session.error_detail.clone().expect("error detail");
    assert!(detail.starts_with("Error creating archive: "), "{}", detail);

    // Failed sessions still get a retention cleanup, scheduled after the error event
    for _ in 0..100 {
        if orchestrator.pending_cleanups().await == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(orchestrator.pending_cleanups().await, 1);

    let events = drain_events(&mut rx, &id);
    match events.last() {
        Some(ProgressEvent::Error { message, .. }) => assert_eq!(message, &detail),
        other => panic!("expected trailing error event, got {:?}", other),
    }
    assert!(!events
        .iter()
        .any(|e| matches!(e, ProgressEvent::Complete { .. })));

    assert!(matches!(
        orchestrator.artifact_path(&id).await,
        Err(OrchestratorError::NotComplete(_))
    ));
    let calls = harness.archiver.recorded_calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, harness.temp_dir.path().join(&id));
}

#[tokio::test]
async fn test_start_validates_input() {
    let harness = TestHarness::new();
    let orchestrator = harness.create_orchestrator(60_000);

    let err = orchestrator.start("").await.unwrap_err();
    assert_eq!(err.to_string(), "No playlist URL provided");

    harness.provider.set_configured(false);
    let err = orchestrator
        .start(&fixtures::playlist_url("pl"))
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::ProviderNotConfigured(_)));

    assert!(orchestrator.list_sessions().await.is_empty());
    assert!(harness.provider.recorded_requests().await.is_empty());
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn test_sessions_run_independently() {
    let harness = TestHarness::new();
    harness.provider.set_tracks("a", fixtures::tracks(2)).await;
    harness.provider.set_tracks("b", fixtures::tracks(3)).await;
    let orchestrator = harness.create_orchestrator(60_000);

    let id_a = orchestrator.start(&fixtures::playlist_url("a")).await.unwrap();
    let id_b = orchestrator.start(&fixtures::playlist_url("b")).await.unwrap();
    assert_ne!(id_a, id_b);

    let a = TestHarness::wait_for_terminal(&orchestrator, &id_a, Duration::from_secs(5))
        .await
        .unwrap();
    let b = TestHarness::wait_for_terminal(&orchestrator, &id_b, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!((a.completed_count, a.total_count), (2, 2));
    assert_eq!((b.completed_count, b.total_count), (3, 3));
    assert_ne!(a.artifact_path, b.artifact_path);
    assert_eq!(orchestrator.list_sessions().await.len(), 2);
}

#[tokio::test]
async fn test_start_returns_before_resolution() {
    let harness = TestHarness::new();
    harness.provider.set_tracks("slow", fixtures::tracks(1)).await;
    harness.provider.set_delay(Duration::from_millis(300)).await;
    let orchestrator = harness.create_orchestrator(60_000);

    let id = orchestrator
        .start(&fixtures::playlist_url("slow"))
        .await
        .unwrap();

    let session = orchestrator.get_session(&id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Starting);
    assert_eq!(session.total_count, 0);

    let session = TestHarness::wait_for_terminal(&orchestrator, &id, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(session.status, SessionStatus::Complete);
}

// =============================================================================
// Retention
// =============================================================================

#[tokio::test]
async fn test_session_reaped_after_retention() {
    let harness = TestHarness::new();
    harness.provider.set_tracks("pl", fixtures::tracks(1)).await;
    let orchestrator = harness.create_orchestrator(100);

    let id = orchestrator.start(&fixtures::playlist_url("pl")).await.unwrap();
    let artifact = harness.temp_dir.path().join(format!("{}.zip", id));
    let session_dir = harness.temp_dir.path().join(&id);

    assert!(
        TestHarness::wait_for_removal(&orchestrator, &id, Duration::from_secs(5)).await,
        "session was not reaped"
    );

    assert!(!artifact.exists());
    assert!(!session_dir.exists());
    assert!(orchestrator.progress().latest(&id).is_none());
    assert!(matches!(
        orchestrator.artifact_path(&id).await,
        Err(OrchestratorError::SessionNotFound(_))
    ));
    assert_eq!(orchestrator.pending_cleanups().await, 0);
}

#[tokio::test]
async fn test_failed_session_is_reaped_too() {
    let harness = TestHarness::new();
    harness
        .provider
        .set_next_error(CatalogError::AuthFailed("bad secret".to_string()))
        .await;
    let orchestrator = harness.create_orchestrator(100);

    let id = orchestrator.start(&fixtures::playlist_url("pl")).await.unwrap();
    assert!(TestHarness::wait_for_removal(&orchestrator, &id, Duration::from_secs(5)).await);
    assert!(!harness.temp_dir.path().join(&id).exists());
}

#[tokio::test]
async fn test_shutdown_cancels_pending_cleanups() {
    let harness = TestHarness::new();
    harness.provider.set_tracks("pl", fixtures::tracks(1)).await;
    let orchestrator = harness.create_orchestrator(300);

    let id = orchestrator.start(&fixtures::playlist_url("pl")).await.unwrap();
    TestHarness::wait_for_terminal(&orchestrator, &id, Duration::from_secs(5))
        .await
        .unwrap();

    orchestrator.shutdown().await;
    tokio::time::sleep(Duration::from_millis(600)).await;

    // The cleanup never ran
    assert!(orchestrator.get_session(&id).await.is_some());
    assert!(orchestrator.artifact_path(&id).await.is_ok());
    assert!(matches!(
        orchestrator.start(&fixtures::playlist_url("pl")).await,
        Err(OrchestratorError::ShuttingDown)
    ));
}
