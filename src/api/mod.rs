//! HTTP API module
//!
//! The control surface: endpoints for setting/cancelling the timer,
//! reading status, and adapter diagnostics.

pub mod handlers;
pub mod responses;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/timer", post(set_timer_handler).delete(cancel_timer_handler))
        .route("/status", get(status_handler))
        .route("/playing", get(playing_handler))
        .route("/adapter/ready", post(adapter_ready_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
