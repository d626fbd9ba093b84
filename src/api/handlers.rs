//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use tracing::{error, info, warn};

use crate::{
    engine::{Reconciliation, TimerError, Transition},
    state::{Lap, Session, SessionError, SessionSnapshot, SessionStatus},
};
use super::responses::{ApiResponse, HealthResponse, ResetRequest};

type ApiError = (StatusCode, Json<ApiResponse>);

/// Map a session error to its HTTP status and an error body
fn api_error(session: &Session, err: SessionError) -> ApiError {
    let code = match &err {
        SessionError::Timer(TimerError::InvalidOperation)
        | SessionError::Timer(TimerError::NothingToCount)
        | SessionError::NotStarted => StatusCode::CONFLICT,
        SessionError::Timer(TimerError::InvalidDuration { .. }) => StatusCode::BAD_REQUEST,
        SessionError::Timer(TimerError::CorruptSnapshot(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        SessionError::LockPoisoned(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if code == StatusCode::INTERNAL_SERVER_ERROR {
        error!("Request failed: {}", err);
    } else {
        warn!("Request rejected: {}", err);
    }
    (code, Json(ApiResponse::error(err.to_string(), session.display())))
}

/// Handle POST /toggle - Start or pause the timer
pub async fn toggle_handler(State(session): State<Arc<Session>>) -> Result<Json<ApiResponse>, ApiError> {
    match session.toggle().await {
        Ok(Transition::Started { .. }) => {
            info!("Toggle endpoint called - timer running");
            Ok(Json(ApiResponse::running("Timer started".to_string(), session.display())))
        }
        Ok(Transition::Paused) => {
            info!("Toggle endpoint called - timer paused");
            Ok(Json(ApiResponse::stopped("Timer paused".to_string(), session.display())))
        }
        Ok(Transition::Completed) => Ok(Json(ApiResponse::stopped(
            "Countdown completed".to_string(),
            session.display(),
        ))),
        Err(e) => Err(api_error(&session, e)),
    }
}

/// Handle POST /reset - Reset the timer and select its mode
pub async fn reset_handler(
    State(session): State<Arc<Session>>,
    Json(request): Json<ResetRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    match session
        .reset(request.mode, request.hour, request.minute, request.second)
        .await
    {
        Ok(display) => {
            info!("Reset endpoint called - mode {:?}", request.mode);
            Ok(Json(ApiResponse::stopped("Timer reset".to_string(), display)))
        }
        Err(e) => Err(api_error(&session, e)),
    }
}

/// Handle POST /lap - Record the current value as a lap
pub async fn lap_handler(State(session): State<Arc<Session>>) -> Result<Json<Lap>, ApiError> {
    session
        .lap()
        .await
        .map(Json)
        .map_err(|e| api_error(&session, e))
}

/// Handle POST /suspend - The host is about to freeze this process
pub async fn suspend_handler(State(session): State<Arc<Session>>) -> Result<Json<ApiResponse>, ApiError> {
    match session.suspend().await {
        Ok(()) => Ok(Json(ApiResponse::stopped(
            "Session suspended".to_string(),
            session.display(),
        ))),
        Err(e) => Err(api_error(&session, e)),
    }
}

/// Handle POST /resume - The host became active again
pub async fn resume_handler(State(session): State<Arc<Session>>) -> Result<Json<ApiResponse>, ApiError> {
    match session.resume().await {
        Ok(Reconciliation::Completed) => Ok(Json(ApiResponse::stopped(
            "Countdown completed while suspended".to_string(),
            session.display(),
        ))),
        Ok(_) => {
            let running = session
                .status()
                .map(|status| status.running)
                .map_err(|e| api_error(&session, e))?;
            let display = session.display();
            if running {
                Ok(Json(ApiResponse::running("Session resumed".to_string(), display)))
            } else {
                Ok(Json(ApiResponse::stopped("Session resumed".to_string(), display)))
            }
        }
        Err(e) => Err(api_error(&session, e)),
    }
}

/// Handle GET /snapshot - Return the current timer snapshot and laps
pub async fn snapshot_handler(State(session): State<Arc<Session>>) -> Result<Json<SessionSnapshot>, ApiError> {
    session
        .snapshot()
        .map(Json)
        .map_err(|e| api_error(&session, e))
}

/// Handle POST /restore - Rebuild the engine from a snapshot
pub async fn restore_handler(
    State(session): State<Arc<Session>>,
    body: String,
) -> Result<Json<ApiResponse>, ApiError> {
    match session.restore_json(&body).await {
        Ok(true) => Ok(Json(ApiResponse::running(
            "Snapshot restored".to_string(),
            session.display(),
        ))),
        Ok(false) => Ok(Json(ApiResponse::stopped(
            "Snapshot restored".to_string(),
            session.display(),
        ))),
        Err(e) => Err(api_error(&session, e)),
    }
}

/// Handle GET /status - Return current session status
pub async fn status_handler(State(session): State<Arc<Session>>) -> Result<Json<SessionStatus>, ApiError> {
    session
        .status()
        .map(Json)
        .map_err(|e| api_error(&session, e))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
