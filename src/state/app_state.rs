//! Shared application state for the HTTP layer

use std::sync::Arc;
use std::time::Instant;

use crate::coordinator::Coordinator;

/// State handed to every HTTP handler: the coordinator plus server
/// metadata for status display.
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
}

impl AppState {
    pub fn new(coordinator: Arc<Coordinator>, port: u16, host: String) -> Self {
        Self {
            coordinator,
            start_time: Instant::now(),
            port,
            host,
        }
    }

    /// Server uptime as a formatted string.
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}
