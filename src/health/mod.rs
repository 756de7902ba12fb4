//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → Probe each backend concurrently (connect + close, with timeout)
//!     → BackendPool::record_probe → state.rs
//!
//! Passive health checks (passive.rs):
//!     Backend connect failure observed by the dispatcher
//!     → Increment failure streak
//!     → Eject if threshold reached
//!
//! State machine (state.rs):
//!     Healthy ←→ Unhealthy
//! ```
//!
//! # Design Decisions
//! - Active and passive checks are complementary
//! - Ejection requires consecutive failures; one good probe restores
//! - Health state is per-backend, not per-pool

pub mod active;
pub mod passive;
pub mod state;

pub use active::{HealthMonitor, Probe, ProbeFailure, ProbeOutcome, TcpProbe};
pub use state::HealthState;
