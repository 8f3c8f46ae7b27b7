//! Error types for the coordinator, store, and player adapter

use thiserror::Error;

/// Failures surfaced to the control surface as request rejections.
#[derive(Debug, Error)]
pub enum TimerError {
    /// Tab resolution found no open page matching the player origin.
    #[error("no matching player tab found")]
    NoTargetFound,

    /// The requested duration is zero, out of range, or ambiguous.
    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    /// The timer store could not be read or written. Fatal to the
    /// current operation, surfaced to the caller as a rejection.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

/// Failures from the player control adapter.
///
/// These never reach the user: execution failures fall through to the
/// content-handler fallback, and a fallback failure is logged only.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Direct in-page script invocation threw or was not possible.
    #[error("script execution failed: {0}")]
    ExecutionFailed(String),

    /// The content handler did not produce a structured response.
    #[error("no response from content handler: {0}")]
    NoResponse(String),

    /// The completion notification could not be displayed. Non-fatal.
    #[error("notification failed: {0}")]
    NotificationFailed(String),
}
