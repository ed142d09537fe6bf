use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{Session, SessionError, SessionStatus};

/// Process-wide map of live sessions.
///
/// Each session has a single writer (its orchestrator task) until the
/// deferred cleanup removes it.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session in `Starting` and return a snapshot of it.
    pub async fn create(&self, source_reference: &str) -> Session {
        let session = Session::new(source_reference);
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        session
    }

    pub async fn get(&self, id: &str) -> Option<Session> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Atomic read-modify-write of one session.
    ///
    /// The closure's error leaves the session as the closure left it; the
    /// session methods only mutate after their checks pass.
    pub async fn mutate<F, R>(&self, id: &str, f: F) -> Result<R, SessionError>
    where
        F: FnOnce(&mut Session) -> Result<R, SessionError>,
    {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        f(session)
    }

    pub async fn remove(&self, id: &str) -> Option<Session> {
        self.sessions.write().await.remove(id)
    }

    /// All sessions, oldest first.
    pub async fn list(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self.sessions.read().await.values().cloned().collect();
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        sessions
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Number of sessions in the given status.
    pub async fn count_by_status(&self, status: SessionStatus) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.status == status)
            .count()
    }
}
