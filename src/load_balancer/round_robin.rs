//! Round-robin load balancing strategy.
//!
//! The cursor indexes the healthy snapshot, so strict rotation order only
//! holds while the healthy set is stable. When backends drop out or recover
//! the sequence may skip or revisit a backend once; the policy trades exact
//! ordering under churn for a single uncontended `fetch_add` per pick.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{BalancerError, Result};
use crate::geo::ClientOrigin;
use crate::load_balancer::{BackendRef, SelectionPolicy};

/// Round-robin selector.
/// Stores an internal counter to rotate through backends.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of picks served so far.
    pub fn position(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }
}

impl SelectionPolicy for RoundRobin {
    fn choose_from(
        &self,
        candidates: &[BackendRef],
        _origin: Option<&ClientOrigin>,
    ) -> Result<BackendRef> {
        if candidates.is_empty() {
            return Err(BalancerError::NoHealthyBackend);
        }
        // Each caller gets a distinct cursor value.
        let c = self.cursor.fetch_add(1, Ordering::Relaxed);
        Ok(candidates[c % candidates.len()].clone())
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}
