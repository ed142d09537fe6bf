//! Session orchestrator implementation.
//!
//! One tokio task per session runs resolve -> tracks (sequential) -> archive,
//! then schedules a retention cleanup task. Sessions run concurrently with
//! each other and with the request path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::archiver::Archiver;
use crate::catalog::{playlist_id_from_reference, TrackResolver};
use crate::metrics;
use crate::processor::TrackProcessor;
use crate::progress::{ProgressChannel, ProgressPublisher};
use crate::session::{Session, SessionRegistry, SessionStatus};

use super::config::OrchestratorConfig;
use super::types::OrchestratorError;

type CleanupHandles = Arc<Mutex<HashMap<String, JoinHandle<()>>>>;

/// Creates sessions, runs them in the background and reaps them after the
/// retention window.
pub struct SessionOrchestrator {
    config: Arc<OrchestratorConfig>,
    resolver: Arc<TrackResolver>,
    processor: Arc<TrackProcessor>,
    archiver: Arc<dyn Archiver>,
    registry: Arc<SessionRegistry>,
    progress: Arc<ProgressChannel>,

    // Runtime state
    accepting: Arc<AtomicBool>,
    cleanups: CleanupHandles,
    shutdown_tx: broadcast::Sender<()>,
}

/// Everything a background session task needs.
#[derive(Clone)]
struct SessionTask {
    config: Arc<OrchestratorConfig>,
    resolver: Arc<TrackResolver>,
    processor: Arc<TrackProcessor>,
    archiver: Arc<dyn Archiver>,
    registry: Arc<SessionRegistry>,
    progress: Arc<ProgressChannel>,
    accepting: Arc<AtomicBool>,
    cleanups: CleanupHandles,
    shutdown_tx: broadcast::Sender<()>,
}

impl SessionOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        resolver: TrackResolver,
        processor: TrackProcessor,
        archiver: Arc<dyn Archiver>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let progress = Arc::new(ProgressChannel::new(config.progress_buffer));

        Self {
            config: Arc::new(config),
            resolver: Arc::new(resolver),
            processor: Arc::new(processor),
            archiver,
            registry: Arc::new(SessionRegistry::new()),
            progress,
            accepting: Arc::new(AtomicBool::new(true)),
            cleanups: Arc::new(Mutex::new(HashMap::new())),
            shutdown_tx,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn progress(&self) -> Arc<ProgressChannel> {
        Arc::clone(&self.progress)
    }

    /// Whether the metadata provider has credentials.
    pub fn provider_configured(&self) -> bool {
        self.resolver.is_configured()
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    /// Start a session for a playlist reference and return its id.
    ///
    /// Input errors are reported here, synchronously. Everything after
    /// registration happens in a background task; this returns as soon as the
    /// session is registered.
    pub async fn start(&self, source_reference: &str) -> Result<String, OrchestratorError> {
        if !self.is_accepting() {
            return Err(OrchestratorError::ShuttingDown);
        }

        let source_reference = source_reference.trim();
        if source_reference.is_empty() {
            return Err(OrchestratorError::InvalidReference(
                "No playlist URL provided".to_string(),
            ));
        }
        if playlist_id_from_reference(source_reference).is_none() {
            return Err(OrchestratorError::InvalidReference(format!(
                "Invalid playlist URL: {}",
                source_reference
            )));
        }
        if !self.resolver.is_configured() {
            return Err(OrchestratorError::ProviderNotConfigured(
                "Spotify API credentials not configured".to_string(),
            ));
        }

        let session = self.registry.create(source_reference).await;
        let session_id = session.id.clone();

        metrics::SESSIONS_STARTED.inc();
        metrics::SESSIONS_ACTIVE.inc();
        info!("Session {} created for {}", session_id, source_reference);

        let task = self.task();
        tokio::spawn(async move {
            task.run(session).await;
        });

        Ok(session_id)
    }

    /// Snapshot of a session, `None` once reaped.
    pub async fn get_session(&self, session_id: &str) -> Option<Session> {
        self.registry.get(session_id).await
    }

    /// All live sessions, oldest first.
    pub async fn list_sessions(&self) -> Vec<Session> {
        self.registry.list().await
    }

    /// Archive of a completed session.
    pub async fn artifact_path(&self, session_id: &str) -> Result<PathBuf, OrchestratorError> {
        let session = self
            .registry
            .get(session_id)
            .await
            .ok_or_else(|| OrchestratorError::SessionNotFound(session_id.to_string()))?;

        let path = match (session.status, session.artifact_path) {
            (SessionStatus::Complete, Some(path)) => path,
            _ => return Err(OrchestratorError::NotComplete(session_id.to_string())),
        };

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(OrchestratorError::ArtifactMissing(session_id.to_string()));
        }

        Ok(path)
    }

    /// Number of scheduled cleanups that have not run yet.
    pub async fn pending_cleanups(&self) -> usize {
        self.cleanups.lock().await.len()
    }

    /// Stop accepting sessions and cancel every pending cleanup.
    ///
    /// In-flight sessions keep running to completion but will not schedule a
    /// cleanup.
    pub async fn shutdown(&self) {
        if !self.accepting.swap(false, Ordering::SeqCst) {
            warn!("Orchestrator already shut down");
            return;
        }

        info!("Stopping session orchestrator");
        let _ = self.shutdown_tx.send(());

        let mut cleanups = self.cleanups.lock().await;
        let cancelled = cleanups.len();
        for (_, handle) in cleanups.drain() {
            handle.abort();
        }

        info!(
            "Session orchestrator stopped ({} pending cleanups cancelled)",
            cancelled
        );
    }

    fn task(&self) -> SessionTask {
        SessionTask {
            config: Arc::clone(&self.config),
            resolver: Arc::clone(&self.resolver),
            processor: Arc::clone(&self.processor),
            archiver: Arc::clone(&self.archiver),
            registry: Arc::clone(&self.registry),
            progress: Arc::clone(&self.progress),
            accepting: Arc::clone(&self.accepting),
            cleanups: Arc::clone(&self.cleanups),
            shutdown_tx: self.shutdown_tx.clone(),
        }
    }
}

impl SessionTask {
    async fn run(self, session: Session) {
        let started = Instant::now();
        let session_id = session.id.clone();
        let publisher = ProgressPublisher::new(session_id.clone(), Arc::clone(&self.progress));

        let result = match self.execute(&session, &publisher).await {
            Ok(()) => "complete",
            Err(e) => {
                let message = e.to_string();
                error!("Session {} failed: {}", session_id, message);

                if let Err(e) = self
                    .registry
                    .mutate(&session_id, |s| s.fail(message.clone()))
                    .await
                {
                    warn!("Could not mark session {} failed: {}", session_id, e);
                }
                publisher.error(message);
                "failed"
            }
        };

        metrics::SESSIONS_ACTIVE.dec();
        metrics::SESSIONS_FINISHED.with_label_values(&[result]).inc();
        metrics::SESSION_DURATION
            .with_label_values(&[result])
            .observe(started.elapsed().as_secs_f64());

        self.schedule_cleanup(session_id).await;
    }

    async fn execute(
        &self,
        session: &Session,
        publisher: &ProgressPublisher,
    ) -> Result<(), OrchestratorError> {
        let session_id = session.id.as_str();
        let session_dir = self.config.session_dir(session_id);
        tokio::fs::create_dir_all(&session_dir).await?;

        let resolve_start = Instant::now();
        let resolved = self.resolver.resolve(&session.source_reference).await;
        metrics::EXTERNAL_SERVICE_DURATION
            .with_label_values(&["playlist"])
            .observe(resolve_start.elapsed().as_secs_f64());
        let tracks = resolved?;

        let total = tracks.len() as u32;
        self.registry
            .mutate(session_id, |s| s.start_running(total))
            .await?;
        publisher.started(total);
        info!("Session {} running: {} tracks", session_id, total);

        let mut completed = 0;
        for (index, track) in tracks.iter().enumerate() {
            let outcome = self
                .processor
                .process(track, index, &session_dir, publisher)
                .await;

            if outcome.is_downloaded() {
                completed = self
                    .registry
                    .mutate(session_id, |s| s.record_success())
                    .await?;
            }
            publisher.track_progress(completed, total);
            debug!(
                "Session {} progress: {}/{} after track {}",
                session_id,
                completed,
                total,
                index + 1
            );
        }

        let artifact = self.config.artifact_path(session_id);
        let entries = self
            .archiver
            .archive(&session_dir, &artifact, self.processor.audio_extension())
            .await?;

        self.registry
            .mutate(session_id, |s| s.complete(artifact.clone()))
            .await?;
        publisher.complete(self.config.download_url(session_id));

        info!(
            "Session {} complete: {}/{} tracks, {} archived",
            session_id, completed, total, entries
        );
        Ok(())
    }

    /// Schedule removal of the session after the retention window.
    async fn schedule_cleanup(&self, session_id: String) {
        let mut cleanups = self.cleanups.lock().await;

        // Checked under the lock so shutdown either sees this handle or we see the flag
        if !self.accepting.load(Ordering::SeqCst) {
            debug!("Not scheduling cleanup for {}: shutting down", session_id);
            return;
        }

        let retention = Duration::from_millis(self.config.retention_ms);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let task = self.clone();
        let id = session_id.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    debug!("Cleanup for {} cancelled by shutdown", id);
                    return;
                }
                _ = tokio::time::sleep(retention) => {}
            }

            // Out of the map first so shutdown cannot abort a half-finished reap
            task.cleanups.lock().await.remove(&id);
            task.reap(&id).await;
        });

        cleanups.insert(session_id, handle);
    }

    /// Remove the session directory, archive, registry entry and progress topic.
    async fn reap(&self, session_id: &str) {
        remove_path(&self.config.session_dir(session_id), true).await;
        remove_path(&self.config.artifact_path(session_id), false).await;

        self.registry.remove(session_id).await;
        self.progress.close(session_id);

        metrics::SESSIONS_CLEANED.inc();
        info!("Session {} cleaned up", session_id);
    }
}

async fn remove_path(path: &Path, is_dir: bool) {
    let result = if is_dir {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };

    match result {
        Ok(()) => debug!("Removed {:?}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {:?}: {}", path, e),
    }
}
