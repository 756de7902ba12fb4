//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Server list → Pool → Policy → Metrics → Bind → Health monitor → Dispatcher
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain sessions → Abort stragglers → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: backend set first, listener last
//! - Ordered shutdown: stop accept, drain, close
//! - Shutdown has timeout: forced close after deadline

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{drain, DrainReport, Shutdown, ShutdownSignal};
pub use signals::{spawn_signal_handler, wait_for_termination};
pub use startup::{run, start, Balancer};
