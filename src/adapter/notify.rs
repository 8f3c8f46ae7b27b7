//! Completion notification interface

use async_trait::async_trait;
use tracing::info;

use crate::error::AdapterError;

/// Best-effort user-visible notification. A failure to display is
/// logged by the caller and never fails the timer.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, body: &str) -> Result<(), AdapterError>;
}

/// Notifier that writes to the log stream.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, title: &str, body: &str) -> Result<(), AdapterError> {
        info!(%title, %body, "timer completion notification");
        Ok(())
    }
}
