//! Session API handlers.

use axum::{
    body::Body,
    extract::{FromRequest, Path, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use mixtape_core::{OrchestratorError, Session, SessionStatus};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a session, JSON or form-encoded
#[derive(Debug, Deserialize)]
pub struct CreateSessionBody {
    /// Shareable playlist URL or `spotify:playlist:` URI
    #[serde(default)]
    pub playlist_url: Option<String>,
}

/// Response for a newly created session
#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub message: String,
}

/// Snapshot of a session
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub status: SessionStatus,
    pub source_reference: String,
    pub created_at: String,
    pub completed_at: Option<String>,
    pub completed: u32,
    pub total: u32,
    pub percentage: u32,
    pub error: Option<String>,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        let percentage = session.percentage();
        Self {
            session_id: session.id,
            status: session.status,
            source_reference: session.source_reference,
            created_at: session.created_at.to_rfc3339(),
            completed_at: session.completed_at.map(|t| t.to_rfc3339()),
            completed: session.completed_count,
            total: session.total_count,
            percentage,
            error: session.error_detail,
        }
    }
}

/// Response for listing sessions
#[derive(Debug, Serialize)]
pub struct ListSessionsResponse {
    pub sessions: Vec<SessionResponse>,
    pub total: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct SessionErrorResponse {
    pub error: String,
}

type ErrorReply = (StatusCode, Json<SessionErrorResponse>);

fn error_reply(err: OrchestratorError) -> ErrorReply {
    let status = match &err {
        OrchestratorError::InvalidReference(_) => StatusCode::BAD_REQUEST,
        OrchestratorError::ProviderNotConfigured(_) | OrchestratorError::ShuttingDown => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        OrchestratorError::SessionNotFound(_)
        | OrchestratorError::NotComplete(_)
        | OrchestratorError::ArtifactMissing(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(SessionErrorResponse {
            error: err.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Read `playlist_url` from a JSON or form body.
///
/// A missing or unreadable body yields `None`, which `start` rejects as a
/// missing reference.
async fn playlist_url_from_request(request: Request) -> Option<String> {
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false);

    let body = if is_json {
        Json::<CreateSessionBody>::from_request(request, &()).await.ok()?.0
    } else {
        Form::<CreateSessionBody>::from_request(request, &()).await.ok()?.0
    };

    body.playlist_url
}

/// Start a download session
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ErrorReply> {
    let reference = playlist_url_from_request(request).await.unwrap_or_default();

    let session_id = state
        .orchestrator()
        .start(&reference)
        .await
        .map_err(error_reply)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateSessionResponse {
            session_id,
            message: "Download started".to_string(),
        }),
    ))
}

/// List live sessions
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<ListSessionsResponse> {
    let sessions: Vec<SessionResponse> = state
        .orchestrator()
        .list_sessions()
        .await
        .into_iter()
        .map(SessionResponse::from)
        .collect();

    Json(ListSessionsResponse {
        total: sessions.len(),
        sessions,
    })
}

/// Get a session by ID
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ErrorReply> {
    match state.orchestrator().get_session(&id).await {
        Some(session) => Ok(Json(SessionResponse::from(session))),
        None => Err(error_reply(OrchestratorError::SessionNotFound(id))),
    }
}

/// Stream the archive of a completed session
pub async fn download_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ErrorReply> {
    let orchestrator = state.orchestrator();
    let path = orchestrator.artifact_path(&id).await.map_err(error_reply)?;

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            // Reaped between the lookup and the open
            warn!("Failed to open archive {:?}: {}", path, e);
            return Err(error_reply(OrchestratorError::ArtifactMissing(id)));
        }
    };

    info!("Serving archive for session {}", id);

    let disposition = format!(
        "attachment; filename=\"{}\"",
        orchestrator.config().archive_file_name
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}
