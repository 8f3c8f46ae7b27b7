//! Target resolution interface
//!
//! Enumerates the open pages that might host the player. The selection
//! policy itself (audible first, then first match, then the stored
//! handle) belongs to the coordinator; resolvers only report what is
//! currently open.

use async_trait::async_trait;

use crate::state::TargetHandle;

/// An open page/session that may host the player.
#[derive(Debug, Clone)]
pub struct TargetCandidate {
    pub handle: TargetHandle,
    /// Web origin of the page, compared against the configured player
    /// origin.
    pub origin: String,
    /// Whether the session is currently producing audio output.
    pub audible: bool,
}

impl TargetCandidate {
    pub fn matches_origin(&self, origin: &str) -> bool {
        self.origin == origin
    }
}

/// Lookup of currently-open candidate targets.
#[async_trait]
pub trait TargetResolver: Send + Sync {
    /// All open candidates matching the given player origin.
    async fn candidates(&self, origin: &str) -> Vec<TargetCandidate>;

    /// Re-resolve a previously stored handle. `None` when the page is
    /// gone or no longer matches the origin.
    async fn resolve(&self, handle: &TargetHandle, origin: &str) -> Option<TargetCandidate>;
}

/// Resolver over a fixed candidate list.
///
/// Production deployments without browser integration advertise a
/// single configured session; tests script arbitrary tab layouts.
#[derive(Debug, Default)]
pub struct StaticResolver {
    candidates: Vec<TargetCandidate>,
}

impl StaticResolver {
    pub fn new(candidates: Vec<TargetCandidate>) -> Self {
        Self { candidates }
    }

    /// A resolver advertising one always-audible session.
    pub fn single(handle: impl Into<String>, origin: impl Into<String>) -> Self {
        Self::new(vec![TargetCandidate {
            handle: TargetHandle::new(handle),
            origin: origin.into(),
            audible: true,
        }])
    }
}

#[async_trait]
impl TargetResolver for StaticResolver {
    async fn candidates(&self, origin: &str) -> Vec<TargetCandidate> {
        self.candidates
            .iter()
            .filter(|c| c.matches_origin(origin))
            .cloned()
            .collect()
    }

    async fn resolve(&self, handle: &TargetHandle, origin: &str) -> Option<TargetCandidate> {
        self.candidates
            .iter()
            .find(|c| &c.handle == handle && c.matches_origin(origin))
            .cloned()
    }
}
