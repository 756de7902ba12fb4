//! TCP load balancer library.
//!
//! Accepts client TCP connections and relays each one, byte for byte, to a
//! healthy backend chosen round-robin or by geographic proximity.
//!
//! ```text
//!   client ──▶ net::Listener ──▶ Dispatcher ──▶ SelectionPolicy ──▶ BackendPool
//!                                    │                                  ▲
//!                                    ▼                                  │
//!                             proxy::Session ◀──▶ backend         HealthMonitor
//! ```

// Core subsystems
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod geo;
pub mod net;
pub mod proxy;

// Traffic management
pub mod health;
pub mod load_balancer;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::BalancerConfig;
pub use dispatcher::{DispatchSettings, DispatchSummary, Dispatcher};
pub use error::{BalancerError, Result};
pub use lifecycle::Shutdown;
