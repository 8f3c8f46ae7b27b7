//! Naptime - a state-managed HTTP service that pauses a web media
//! player after a sleep timer
//!
//! Three cooperating pieces: an HTTP control surface for setting and
//! cancelling the timer, a background coordinator owning wake-up
//! scheduling and the pause sequence, and pluggable player-control
//! adapters that act on the target page.

pub mod adapter;
pub mod api;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod state;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use coordinator::Coordinator;
pub use state::AppState;
pub use utils::shutdown_signal;
