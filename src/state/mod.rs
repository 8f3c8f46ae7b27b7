//! Timer state module
//!
//! The persisted timer record, the store contract, and the shared
//! application state handed to the HTTP layer.

pub mod app_state;
pub mod record;
pub mod store;

pub use app_state::AppState;
pub use record::{TargetHandle, TimerRecord};
pub use store::{FileTimerStore, MemoryTimerStore, TimerStore};
