//! Background coordinator module
//!
//! Owns the singleton timer lifecycle: scheduling wake-ups, restart
//! recovery, tab resolution, and the pause sequence.

pub mod engine;
pub mod types;

pub use engine::Coordinator;
pub use types::{DurationSpec, Phase, TimerEvent, TimerStatus};
