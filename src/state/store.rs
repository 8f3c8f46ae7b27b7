//! Durable persistence for the singleton timer record
//!
//! The store is a plain key-value contract: it never schedules wake-ups
//! and has no side effects beyond persistence. The coordinator is the
//! only writer.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::error::TimerError;
use crate::state::TimerRecord;

/// Key-value persistence for the singleton timer, visible across
/// process restarts.
#[async_trait]
pub trait TimerStore: Send + Sync {
    /// Replace any existing record atomically - callers never observe
    /// partial state.
    async fn write(&self, record: &TimerRecord) -> Result<(), TimerError>;

    /// Read the current record, if any.
    async fn read(&self) -> Result<Option<TimerRecord>, TimerError>;

    /// Remove the record. Idempotent: clearing an absent record is not
    /// an error.
    async fn clear(&self) -> Result<(), TimerError>;
}

/// File-backed store: a single JSON object written via temp file plus
/// rename so a crash mid-write never leaves a torn record.
#[derive(Debug)]
pub struct FileTimerStore {
    path: PathBuf,
}

impl FileTimerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut path = self.path.clone();
        path.set_extension("json.tmp");
        path
    }
}

#[async_trait]
impl TimerStore for FileTimerStore {
    async fn write(&self, record: &TimerRecord) -> Result<(), TimerError> {
        let json = serde_json::to_vec_pretty(record)
            .map_err(|e| TimerError::Persistence(format!("failed to encode timer record: {e}")))?;

        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| TimerError::Persistence(format!("failed to write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            TimerError::Persistence(format!("failed to replace {}: {e}", self.path.display()))
        })?;

        debug!(path = %self.path.display(), "timer record persisted");
        Ok(())
    }

    async fn read(&self) -> Result<Option<TimerRecord>, TimerError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(TimerError::Persistence(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )))
            }
        };

        let record = serde_json::from_slice(&bytes)
            .map_err(|e| TimerError::Persistence(format!("corrupt timer record: {e}")))?;
        Ok(Some(record))
    }

    async fn clear(&self) -> Result<(), TimerError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "timer record cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TimerError::Persistence(format!(
                "failed to remove {}: {e}",
                self.path.display()
            ))),
        }
    }
}

/// In-memory store with the same contract, used by tests and by
/// deployments that do not want restart recovery.
#[derive(Debug, Default)]
pub struct MemoryTimerStore {
    record: Mutex<Option<TimerRecord>>,
}

impl MemoryTimerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TimerStore for MemoryTimerStore {
    async fn write(&self, record: &TimerRecord) -> Result<(), TimerError> {
        let mut slot = self
            .record
            .lock()
            .map_err(|e| TimerError::Persistence(format!("store lock poisoned: {e}")))?;
        *slot = Some(record.clone());
        Ok(())
    }

    async fn read(&self) -> Result<Option<TimerRecord>, TimerError> {
        let slot = self
            .record
            .lock()
            .map_err(|e| TimerError::Persistence(format!("store lock poisoned: {e}")))?;
        Ok(slot.clone())
    }

    async fn clear(&self) -> Result<(), TimerError> {
        let mut slot = self
            .record
            .lock()
            .map_err(|e| TimerError::Persistence(format!("store lock poisoned: {e}")))?;
        *slot = None;
        Ok(())
    }
}
