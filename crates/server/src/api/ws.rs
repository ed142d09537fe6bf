//! WebSocket progress stream.
//!
//! `GET /api/v1/ws?session_id=<id>` streams one session: its latest event
//! first, then live events until the session is reaped. Without
//! `session_id` the client receives every session's events.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use mixtape_core::ProgressEvent;

use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_LAG_EVENTS, WS_MESSAGES_SENT};
use crate::state::AppState;

/// Query parameters for the progress stream.
#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    /// Restrict the stream to one session.
    pub session_id: Option<String>,
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params.session_id))
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, session_id: Option<String>) {
    let (mut sender, mut receiver) = socket.split();

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();

    let orchestrator = Arc::clone(state.orchestrator());
    let progress = orchestrator.progress();

    let (latest, rx) = match &session_id {
        Some(id) => {
            if orchestrator.get_session(id).await.is_none() {
                info!("WebSocket client asked for unknown session {}", id);
                let _ = sender.send(Message::Close(None)).await;
                WS_CONNECTIONS_ACTIVE.dec();
                return;
            }

            let subscription = progress.subscribe(id);

            // Reaped between the lookup and the subscription
            if orchestrator.get_session(id).await.is_none() {
                progress.close(id);
                let _ = sender.send(Message::Close(None)).await;
                WS_CONNECTIONS_ACTIVE.dec();
                return;
            }

            (subscription.latest, subscription.receiver)
        }
        None => (None, progress.subscribe_all()),
    };

    info!(
        "WebSocket client connected ({})",
        session_id.as_deref().unwrap_or("all sessions")
    );

    let send_task = tokio::spawn(forward_events(sender, latest, rx));

    // Handle incoming messages from client (ping/pong, close)
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Close(_)) => {
                debug!("WebSocket client requested close");
                break;
            }
            Ok(Message::Text(text)) => {
                // We don't expect any client messages, but log them
                debug!("Received text message: {}", text);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    send_task.abort();
    WS_CONNECTIONS_ACTIVE.dec();
    info!("WebSocket client disconnected");
}

/// Forward progress events until the client goes away or the topic closes.
async fn forward_events(
    mut sender: SplitSink<WebSocket, Message>,
    latest: Option<ProgressEvent>,
    mut rx: broadcast::Receiver<ProgressEvent>,
) {
    if let Some(event) = latest {
        if !send_event(&mut sender, &event).await {
            return;
        }
    }

    loop {
        match rx.recv().await {
            Ok(event) => {
                if !send_event(&mut sender, &event).await {
                    debug!("WebSocket send failed, client disconnected");
                    return;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("WebSocket client lagged, skipped {} events", n);
                WS_LAG_EVENTS.inc();
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("Progress topic closed");
                let _ = sender.send(Message::Close(None)).await;
                return;
            }
        }
    }
}

async fn send_event(sender: &mut SplitSink<WebSocket, Message>, event: &ProgressEvent) -> bool {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize progress event: {}", e);
            return true;
        }
    };

    WS_MESSAGES_SENT.with_label_values(&[event.kind()]).inc();
    sender.send(Message::Text(json.into())).await.is_ok()
}
