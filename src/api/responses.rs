//! API response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coordinator::Phase;

/// Response for set/cancel requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerResponse {
    pub accepted: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl TimerResponse {
    pub fn accepted(message: impl Into<String>) -> Self {
        Self {
            accepted: true,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            accepted: false,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Timer status with countdown information for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub phase: Phase,
    pub timer_active: bool,
    pub end_time_ms: Option<i64>,
    pub duration_ms: Option<i64>,
    pub remaining_seconds: Option<u64>,
    pub tab_id: Option<String>,
    pub uptime: String,
    pub port: u16,
    pub host: String,
}

/// Playback diagnostics reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayingResponse {
    #[serde(rename = "isPlaying")]
    pub is_playing: bool,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
