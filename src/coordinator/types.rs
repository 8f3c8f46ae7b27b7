//! Coordinator lifecycle types

use serde::{Deserialize, Serialize};

use crate::error::TimerError;
use crate::state::TimerRecord;

/// Lifecycle phase of the singleton timer.
///
/// `Idle`: no stored record, no scheduled wake-up. `Armed`: record
/// present and exactly one wake-up scheduled for its end time.
/// `Firing`: the pause sequence is in progress; returns to `Idle`
/// unconditionally when it completes, success or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Armed,
    Firing,
}

/// Requested timer length: whole minutes, or whole seconds for short
/// and test durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationSpec {
    Minutes(u64),
    Seconds(u64),
}

impl DurationSpec {
    /// Duration in milliseconds. Zero and overflowing values are
    /// rejected.
    pub fn as_millis(&self) -> Result<i64, TimerError> {
        let ms = match *self {
            DurationSpec::Minutes(m) => m.checked_mul(60_000),
            DurationSpec::Seconds(s) => s.checked_mul(1_000),
        }
        .and_then(|ms| i64::try_from(ms).ok())
        .ok_or_else(|| TimerError::InvalidDuration("duration out of range".to_string()))?;

        if ms == 0 {
            return Err(TimerError::InvalidDuration(
                "duration must be positive".to_string(),
            ));
        }
        Ok(ms)
    }
}

/// Unsolicited events broadcast to control-surface subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum TimerEvent {
    /// A timer was set or replaced; fires at `end_time_ms`.
    Armed { end_time_ms: i64 },
    /// The timer was cancelled before firing.
    Cancelled,
    /// The timer fired and the pause sequence ran to a successful pause.
    Completed,
}

/// Snapshot of the timer for status display.
#[derive(Debug, Clone)]
pub struct TimerStatus {
    pub phase: Phase,
    pub record: Option<TimerRecord>,
    /// Seconds until the fire time, derived for display only.
    pub remaining_seconds: Option<u64>,
}
