use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::trace;

use super::ProgressEvent;

/// Default per-topic buffer.
pub const DEFAULT_PROGRESS_BUFFER: usize = 256;

struct Topic {
    sender: broadcast::Sender<ProgressEvent>,
    latest: Option<ProgressEvent>,
}

/// Publish/subscribe hub for session progress.
///
/// Each session gets its own broadcast topic, plus a firehose carrying every
/// session's events. Publishing never blocks: a subscriber that falls more
/// than `capacity` events behind loses the oldest ones and observes
/// [`broadcast::error::RecvError::Lagged`].
///
/// The latest event of every topic is retained so a late subscriber can
/// render current state; it is handed out atomically with the subscription,
/// so it is neither duplicated nor reordered relative to live events.
pub struct ProgressChannel {
    capacity: usize,
    topics: Mutex<HashMap<String, Topic>>,
    firehose: broadcast::Sender<ProgressEvent>,
}

/// A session subscription.
pub struct ProgressSubscription {
    /// Most recent event published before subscribing, if any.
    pub latest: Option<ProgressEvent>,
    pub receiver: broadcast::Receiver<ProgressEvent>,
}

impl ProgressChannel {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (firehose, _) = broadcast::channel(capacity);
        Self {
            capacity,
            topics: Mutex::new(HashMap::new()),
            firehose,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Topic>> {
        // A panic while holding the lock cannot leave a topic half-updated
        self.topics.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn new_topic(&self) -> Topic {
        let (sender, _) = broadcast::channel(self.capacity);
        Topic {
            sender,
            latest: None,
        }
    }

    /// Publish an event to its session topic and the firehose.
    pub fn publish(&self, event: ProgressEvent) {
        let mut topics = self.lock();
        let topic = topics
            .entry(event.session_id().to_string())
            .or_insert_with(|| self.new_topic());

        topic.latest = Some(event.clone());
        let delivered = topic.sender.send(event.clone()).unwrap_or(0);
        // No receivers is not an error
        let _ = self.firehose.send(event);

        trace!("Published progress event to {} subscribers", delivered);
    }

    /// Subscribe to one session's events.
    pub fn subscribe(&self, session_id: &str) -> ProgressSubscription {
        let mut topics = self.lock();
        let topic = topics
            .entry(session_id.to_string())
            .or_insert_with(|| self.new_topic());

        ProgressSubscription {
            latest: topic.latest.clone(),
            receiver: topic.sender.subscribe(),
        }
    }

    /// Subscribe to every session's events.
    pub fn subscribe_all(&self) -> broadcast::Receiver<ProgressEvent> {
        self.firehose.subscribe()
    }

    /// Most recent event of a session.
    pub fn latest(&self, session_id: &str) -> Option<ProgressEvent> {
        self.lock().get(session_id).and_then(|t| t.latest.clone())
    }

    /// Drop a session topic. Its subscribers drain what is buffered, then
    /// observe the channel as closed.
    pub fn close(&self, session_id: &str) {
        self.lock().remove(session_id);
    }

    pub fn topic_count(&self) -> usize {
        self.lock().len()
    }
}

impl Default for ProgressChannel {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_BUFFER)
    }
}

/// Publishing handle bound to one session.
#[derive(Clone)]
pub struct ProgressPublisher {
    session_id: String,
    channel: Arc<ProgressChannel>,
}

impl ProgressPublisher {
    pub fn new(session_id: impl Into<String>, channel: Arc<ProgressChannel>) -> Self {
        Self {
            session_id: session_id.into(),
            channel,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn downloading(&self, query: &str) {
        self.channel.publish(ProgressEvent::Downloading {
            session_id: self.session_id.clone(),
            current_track: query.to_string(),
        });
    }

    pub fn started(&self, total_tracks: u32) {
        self.channel.publish(ProgressEvent::Started {
            session_id: self.session_id.clone(),
            total_tracks,
        });
    }

    pub fn track_progress(&self, completed: u32, total: u32) {
        self.channel.publish(ProgressEvent::TrackProgress {
            session_id: self.session_id.clone(),
            completed,
            total,
            percentage: crate::session::percentage(completed, total),
        });
    }

    pub fn error(&self, message: impl Into<String>) {
        self.channel.publish(ProgressEvent::Error {
            session_id: self.session_id.clone(),
            message: message.into(),
        });
    }

    pub fn complete(&self, download_url: impl Into<String>) {
        self.channel.publish(ProgressEvent::Complete {
            session_id: self.session_id.clone(),
            download_url: download_url.into(),
        });
    }
}
