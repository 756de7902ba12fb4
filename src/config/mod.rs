//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! CLI flags (port, policy, server list path, optional config file)
//!     → loader.rs (parse TOML tunables & deserialize)
//!     → validation.rs (semantic checks)
//!     → BalancerConfig (validated, immutable)
//!
//! server list file
//!     → server_list.rs (records → Vec<BackendDescriptor>)
//!     → load_balancer::pool (fails fast on an empty set)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the backend set never changes at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod server_list;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BackendDescriptor, BalancerConfig, GeoConfig, GeoFallback, GeoOriginConfig,
    HealthCheckConfig, ListenerConfig, ObservabilityConfig, PassiveHealthConfig, PolicyKind,
    RetryConfig, TimeoutConfig,
};
pub use server_list::{load_server_list, parse_server_list};
pub use validation::{validate_config, ValidationError};
