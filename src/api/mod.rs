//! HTTP API module
//! 
//! This module contains all HTTP endpoint handlers and response structures.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::Session;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(session: Arc<Session>) -> Router {
    Router::new()
        .route("/toggle", post(toggle_handler))
        .route("/reset", post(reset_handler))
        .route("/lap", post(lap_handler))
        // Host lifecycle hooks
        .route("/suspend", post(suspend_handler))
        .route("/resume", post(resume_handler))
        .route("/snapshot", get(snapshot_handler))
        .route("/restore", post(restore_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(session)
}
