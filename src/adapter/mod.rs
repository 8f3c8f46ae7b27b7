//! External collaborator interfaces
//!
//! The coordinator acts on the page through these capability traits so
//! page-specific logic stays pluggable: pause execution, target
//! lookup, and completion notifications.

pub mod notify;
pub mod player;
pub mod resolver;

pub use notify::{LogNotifier, Notifier};
pub use player::{DetachedPlayer, PauseReply, PlayerControl};
pub use resolver::{StaticResolver, TargetCandidate, TargetResolver};
