//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json};
use serde::Deserialize;
use tracing::{error, info, warn};

use super::responses::{HealthResponse, PlayingResponse, StatusResponse, TimerResponse};
use crate::coordinator::DurationSpec;
use crate::error::TimerError;
use crate::state::{AppState, TargetHandle};

/// Body of a set-timer request: whole minutes, or whole seconds for
/// short durations, plus an optional explicit target captured by the
/// control surface.
#[derive(Debug, Deserialize)]
pub struct SetTimerRequest {
    pub minutes: Option<u64>,
    pub seconds: Option<u64>,
    pub tab_id: Option<String>,
}

impl SetTimerRequest {
    fn duration_spec(&self) -> Result<DurationSpec, String> {
        match (self.minutes, self.seconds) {
            (Some(minutes), None) => Ok(DurationSpec::Minutes(minutes)),
            (None, Some(seconds)) => Ok(DurationSpec::Seconds(seconds)),
            (Some(_), Some(_)) => Err("specify either minutes or seconds, not both".to_string()),
            (None, None) => Err("a duration in minutes or seconds is required".to_string()),
        }
    }
}

/// Body of an adapter liveness announcement.
#[derive(Debug, Deserialize)]
pub struct AdapterReadyRequest {
    pub tab_id: String,
}

/// Handle POST /timer - set or replace the timer
pub async fn set_timer_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetTimerRequest>,
) -> (StatusCode, Json<TimerResponse>) {
    let spec = match request.duration_spec() {
        Ok(spec) => spec,
        Err(message) => {
            warn!(%message, "rejected set-timer request");
            return (
                StatusCode::BAD_REQUEST,
                Json(TimerResponse::rejected(message)),
            );
        }
    };
    let target = request.tab_id.as_deref().map(TargetHandle::new);

    match state.coordinator.set_timer(spec, target).await {
        Ok(record) => {
            info!(end_time_ms = record.end_time_ms, "set-timer request accepted");
            (
                StatusCode::OK,
                Json(TimerResponse::accepted(format!(
                    "Timer set for {} seconds",
                    record.duration_ms / 1_000
                ))),
            )
        }
        Err(e @ TimerError::NoTargetFound) => {
            warn!("set-timer rejected: {e}");
            (
                StatusCode::NOT_FOUND,
                Json(TimerResponse::rejected(e.to_string())),
            )
        }
        Err(e @ TimerError::InvalidDuration(_)) => (
            StatusCode::BAD_REQUEST,
            Json(TimerResponse::rejected(e.to_string())),
        ),
        Err(e @ TimerError::Persistence(_)) => {
            error!("set-timer failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(TimerResponse::rejected(e.to_string())),
            )
        }
    }
}

/// Handle DELETE /timer - cancel the timer (idempotent)
pub async fn cancel_timer_handler(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<TimerResponse>) {
    match state.coordinator.cancel().await {
        Ok(()) => (
            StatusCode::OK,
            Json(TimerResponse::accepted("Timer cancelled")),
        ),
        Err(e) => {
            error!("cancel-timer failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(TimerResponse::rejected(e.to_string())),
            )
        }
    }
}

/// Handle GET /status - current timer state and countdown
pub async fn status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, StatusCode> {
    match state.coordinator.status().await {
        Ok(status) => Ok(Json(StatusResponse {
            phase: status.phase,
            timer_active: status.record.is_some(),
            end_time_ms: status.record.as_ref().map(|r| r.end_time_ms),
            duration_ms: status.record.as_ref().map(|r| r.duration_ms),
            remaining_seconds: status.remaining_seconds,
            tab_id: status.record.as_ref().map(|r| r.tab_id.to_string()),
            uptime: state.get_uptime(),
            port: state.port,
            host: state.host.clone(),
        })),
        Err(e) => {
            error!("failed to read timer status: {e}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle GET /playing - playback diagnostics via the adapter
pub async fn playing_handler(State(state): State<Arc<AppState>>) -> Json<PlayingResponse> {
    Json(PlayingResponse {
        is_playing: state.coordinator.check_playing().await,
    })
}

/// Handle POST /adapter/ready - content handler liveness announcement
pub async fn adapter_ready_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AdapterReadyRequest>,
) -> Json<TimerResponse> {
    state
        .coordinator
        .adapter_ready(&TargetHandle::new(request.tab_id));
    Json(TimerResponse::accepted("adapter ready"))
}

/// Handle GET /health - health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
