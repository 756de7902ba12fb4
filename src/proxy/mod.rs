//! TCP proxying.
//!
//! # Data Flow
//! ```text
//! Accepted client + connected backend
//!     → session.rs (ids, active-connection guard, byte counters)
//!     → tunnel.rs (two copy directions, half-close on EOF)
//!     → SessionReport (bytes each way, which leg failed)
//! ```
//!
//! # Design Decisions
//! - Bytes are forwarded untouched; no protocol awareness
//! - Sockets are owned by the relay future so every exit path closes them

pub mod session;
pub mod tunnel;

pub use session::{Session, SessionReport};
pub use tunnel::{relay, Direction, RelayError, RelayResult};
