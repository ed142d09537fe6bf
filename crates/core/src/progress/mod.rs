//! Live progress notifications for download sessions.

mod channel;
mod events;

pub use channel::{ProgressChannel, ProgressPublisher, ProgressSubscription, DEFAULT_PROGRESS_BUFFER};
pub use events::ProgressEvent;
