//! Player control adapter interface
//!
//! The actual pause logic is page-specific (selectors, keyboard events,
//! button heuristics) and lives behind this trait so the coordinator's
//! state machine stays independent of any particular player's markup.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AdapterError;
use crate::state::TargetHandle;

/// Structured reply from the in-page content handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PauseReply {
    pub success: bool,
}

/// Capability interface for acting on a resolved target.
#[async_trait]
pub trait PlayerControl: Send + Sync {
    /// Direct in-page invocation of the pause logic.
    ///
    /// `Ok(false)` means the script ran but could not confirm the pause
    /// took effect; the coordinator still counts that as success.
    async fn attempt_pause(&self, target: &TargetHandle) -> Result<bool, AdapterError>;

    /// Fallback round trip to a previously-injected content handler,
    /// used when direct invocation is not possible.
    async fn send_pause_message(&self, target: &TargetHandle) -> Result<PauseReply, AdapterError>;

    /// Diagnostics: whether the target currently reports active playback.
    async fn is_playing(&self, target: &TargetHandle) -> Result<bool, AdapterError>;
}

/// Placeholder adapter for deployments with no player attached.
///
/// Every pause attempt fails, which exercises the coordinator's
/// best-effort path: the failure is logged and cleanup still runs.
#[derive(Debug, Default)]
pub struct DetachedPlayer;

#[async_trait]
impl PlayerControl for DetachedPlayer {
    async fn attempt_pause(&self, target: &TargetHandle) -> Result<bool, AdapterError> {
        warn!(%target, "no player adapter attached, cannot execute pause script");
        Err(AdapterError::ExecutionFailed(
            "no player adapter attached".to_string(),
        ))
    }

    async fn send_pause_message(&self, target: &TargetHandle) -> Result<PauseReply, AdapterError> {
        warn!(%target, "no player adapter attached, content handler unreachable");
        Err(AdapterError::NoResponse(
            "no player adapter attached".to_string(),
        ))
    }

    async fn is_playing(&self, _target: &TargetHandle) -> Result<bool, AdapterError> {
        Ok(false)
    }
}
