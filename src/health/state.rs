//! Backend health state machine.
//!
//! # States
//! - Healthy: backend receives traffic
//! - Unhealthy: backend excluded from selection, still probed
//!
//! # State Transitions
//! ```text
//! Healthy → Unhealthy: consecutive probe failures >= unhealthy_threshold
//!                      or consecutive connect failures >= passive threshold
//! Unhealthy → Healthy: one successful probe
//! ```
//!
//! The transition rules are pure functions so they can be exercised without
//! sockets; `Backend` applies them to its atomics.

/// Health of a single backend.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy = 0,
    Unhealthy = 1,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            0 => HealthState::Healthy,
            _ => HealthState::Unhealthy,
        }
    }
}

impl HealthState {
    /// State after a failure that brought the consecutive-failure streak to `streak`.
    ///
    /// Returns `None` when no transition happens.
    pub fn after_failure(self, streak: u32, threshold: u32) -> Option<HealthState> {
        match self {
            HealthState::Healthy if streak >= threshold.max(1) => Some(HealthState::Unhealthy),
            _ => None,
        }
    }

    /// State after a successful probe. One success is enough to recover.
    pub fn after_probe_success(self) -> Option<HealthState> {
        match self {
            HealthState::Unhealthy => Some(HealthState::Healthy),
            HealthState::Healthy => None,
        }
    }

    pub fn is_healthy(self) -> bool {
        self == HealthState::Healthy
    }
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthState::Healthy => write!(f, "healthy"),
            HealthState::Unhealthy => write!(f, "unhealthy"),
        }
    }
}
