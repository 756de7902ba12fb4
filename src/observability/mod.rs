//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!     → tracing.rs (per-connection spans)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Connection id flows through every session log line
//! - Metrics are cheap when no exporter is installed

pub mod logging;
pub mod metrics;
pub mod tracing;
