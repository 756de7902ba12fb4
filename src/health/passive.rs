//! Passive health checking (failure detection).
//!
//! # Responsibilities
//! - Observe backend connect outcomes from live traffic
//! - Track consecutive failures
//! - Trigger state transition on threshold breach
//!
//! # Design Decisions
//! - Only connect failures and connect timeouts count; relay errors mid-stream
//!   are the client's or the network's and say nothing about the backend
//! - A successful connect resets the streak but never revives an unhealthy
//!   backend; only a probe does that

use crate::health::state::HealthState;

/// Whether a connect-failure streak of `streak` should take the backend out of rotation.
pub fn should_eject(state: HealthState, streak: u32, threshold: u32) -> bool {
    let eject = state.after_failure(streak, threshold).is_some();
    if eject {
        tracing::debug!(streak, threshold, "Passive failure threshold reached");
    }
    eject
}
