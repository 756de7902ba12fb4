//! Error taxonomy shared by the balancer subsystems.
//!
//! Startup failures (`Config`, `Listener::Bind`) are fatal. Everything else is
//! scoped to a single client connection and never leaves its session task.

use thiserror::Error;

use crate::config::ConfigError;
use crate::net::listener::ListenerError;
use crate::proxy::tunnel::RelayError;

/// Errors produced by the balancer core.
#[derive(Debug, Error)]
pub enum BalancerError {
    /// Invalid configuration or backend set.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Every backend is currently marked unhealthy.
    #[error("no healthy backend available")]
    NoHealthyBackend,

    /// Geographic selection was asked to pick without a resolved client location.
    #[error("client origin unavailable for geographic selection")]
    OriginUnavailable,

    /// Connecting to the chosen backend failed or timed out.
    #[error("failed to connect to backend {backend}: {source}")]
    BackendConnect {
        backend: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O failure while relaying bytes.
    #[error(transparent)]
    Relay(#[from] RelayError),

    /// Listening socket failure.
    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Convenience alias used across the crate.
pub type Result<T, E = BalancerError> = std::result::Result<T, E>;
