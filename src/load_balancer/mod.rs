//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Client accepted → ClientOrigin (peer, optional location)
//!     → pool.rs (healthy snapshot, load order)
//!     → Apply selection policy:
//!         - round_robin.rs (rotate through healthy backends)
//!         - geographic.rs (nearest healthy backend to the client)
//!     → Return backend or error
//! ```
//!
//! # Design Decisions
//! - Policies never lock; round-robin's cursor is the only contended state
//! - The pool owns health; policies only see what the snapshot hands them
//! - Unhealthy backends excluded from selection

pub mod backend;
pub mod geographic;
pub mod pool;
pub mod round_robin;

use std::sync::Arc;

use crate::config::{GeoConfig, PolicyKind};
use crate::error::Result;
use crate::geo::ClientOrigin;

pub use backend::{Backend, BackendConnectionGuard, BackendRef, BackendStats};
pub use geographic::Geographic;
pub use pool::{BackendPool, HealthThresholds};
pub use round_robin::RoundRobin;

/// Strategy choosing which backend serves a new connection.
pub trait SelectionPolicy: Send + Sync + std::fmt::Debug {
    /// Pick among `candidates` (healthy, in load order).
    ///
    /// Fails with `NoHealthyBackend` when `candidates` is empty.
    fn choose_from(
        &self,
        candidates: &[BackendRef],
        origin: Option<&ClientOrigin>,
    ) -> Result<BackendRef>;

    /// Pick among the pool's currently healthy backends.
    fn choose(&self, pool: &BackendPool, origin: Option<&ClientOrigin>) -> Result<BackendRef> {
        self.choose_from(&pool.healthy_snapshot(), origin)
    }

    /// Whether callers should resolve the client's location first.
    fn requires_origin(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str;
}

/// Instantiate the configured policy.
pub fn build_policy(kind: PolicyKind, geo: &GeoConfig) -> Arc<dyn SelectionPolicy> {
    match kind {
        PolicyKind::RoundRobin => Arc::new(RoundRobin::new()),
        PolicyKind::Geographic => Arc::new(Geographic::new(geo.fallback)),
    }
}
