//! Persisted timer record structure

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of the tab/session a timer acts upon.
///
/// Captured at creation time and persisted so the pause sequence can
/// still find its target after a process restart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetHandle(String);

impl TargetHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The singleton timer record - holds everything needed to recover a
/// scheduled pause after a restart.
///
/// Field names match the persisted key-value format: `timerEndTime`,
/// `timerDuration`, `tabId`. Absence of the record means no active timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerRecord {
    /// Absolute fire time, milliseconds since epoch.
    #[serde(rename = "timerEndTime")]
    pub end_time_ms: i64,
    /// Requested duration in milliseconds. Retained for display only,
    /// never re-derived from `end_time_ms`.
    #[serde(rename = "timerDuration")]
    pub duration_ms: i64,
    /// Target captured when the timer was set.
    #[serde(rename = "tabId")]
    pub tab_id: TargetHandle,
}

impl TimerRecord {
    pub fn new(end_time_ms: i64, duration_ms: i64, tab_id: TargetHandle) -> Self {
        Self {
            end_time_ms,
            duration_ms,
            tab_id,
        }
    }

    /// Milliseconds until the fire time, clamped at zero.
    pub fn remaining_ms(&self, now_ms: i64) -> i64 {
        (self.end_time_ms - now_ms).max(0)
    }

    /// Whether the fire time has already passed.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.end_time_ms <= now_ms
    }
}
