//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Connect to chosen backend:
//!     → timeouts.rs (bounded connect)
//!     → On failure: retries.rs (budget check, exclude the failed backend, select again)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every backend connect has a deadline
//! - Only connects are retried; bytes already relayed are never replayed
//! - Retries are bounded per client connection

pub mod retries;
pub mod timeouts;

pub use retries::ConnectAttempts;
pub use timeouts::connect_with_timeout;
