use super::state::AppState;
use crate::session::{SessionError, SessionSnapshot};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tracing::{error, info};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    pub status: String,
    pub message: String,
    pub session: SessionSnapshot,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_status(err: &SessionError) -> StatusCode {
    match err {
        SessionError::AlreadyActive => StatusCode::CONFLICT,
        SessionError::StartFailed(_) => StatusCode::BAD_GATEWAY,
        SessionError::Shutdown => StatusCode::SERVICE_UNAVAILABLE,
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /session/start
/// Start a recording session
///
/// Returns as soon as the start is accepted; startup completes (or fails)
/// asynchronously and shows up in GET /session.
pub async fn start_session(State(state): State<AppState>) -> impl IntoResponse {
    info!("Start requested over HTTP");

    match state.controller.start().await {
        Ok(()) => (
            StatusCode::OK,
            Json(StartSessionResponse {
                status: "starting".to_string(),
                message: "Recording session starting".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to start session: {}", e);
            (
                error_status(&e),
                Json(ErrorResponse {
                    error: format!("Failed to start session: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// POST /session/stop
/// Stop the recording session
///
/// A no-op when idle. The response carries the snapshot taken right after
/// the stop was accepted; the final transcript arrives via the session's
/// Ended event and GET /session.
pub async fn stop_session(State(state): State<AppState>) -> impl IntoResponse {
    info!("Stop requested over HTTP");

    if let Err(e) = state.controller.stop().await {
        error!("Failed to stop session: {}", e);
        return (
            error_status(&e),
            Json(ErrorResponse {
                error: format!("Failed to stop session: {}", e),
            }),
        )
            .into_response();
    }

    match state.controller.snapshot().await {
        Ok(session) => (
            StatusCode::OK,
            Json(StopSessionResponse {
                status: "ok".to_string(),
                message: "Stop requested".to_string(),
                session,
            }),
        )
            .into_response(),
        Err(e) => (
            error_status(&e),
            Json(ErrorResponse {
                error: format!("Failed to read session state: {}", e),
            }),
        )
            .into_response(),
    }
}

/// GET /session
/// State, transcript, and counters of the current (or last) session
pub async fn get_session(State(state): State<AppState>) -> impl IntoResponse {
    match state.controller.snapshot().await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => {
            error!("Failed to read session state: {}", e);
            (
                error_status(&e),
                Json(ErrorResponse {
                    error: format!("Failed to read session state: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
