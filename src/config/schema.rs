//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the balancer.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::geo::GeoLocation;

/// Root configuration for the balancer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BalancerConfig {
    /// Listener configuration (bind host, port, backpressure).
    pub listener: ListenerConfig,

    /// Backend selection policy.
    pub policy: PolicyKind,

    /// Active health check settings.
    pub health_check: HealthCheckConfig,

    /// Passive (live traffic) failure detection.
    pub passive: PassiveHealthConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Backend connect retry configuration.
    pub retries: RetryConfig,

    /// Geographic routing settings.
    pub geo: GeoConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host/interface to bind (e.g., "0.0.0.0").
    pub bind_host: String,

    /// Listening port.
    pub port: u16,

    /// Maximum concurrently handled client connections (backpressure).
    pub max_connections: usize,
}

impl ListenerConfig {
    pub fn bind_address(&self) -> String {
        if self.bind_host.contains(':') {
            format!("[{}]:{}", self.bind_host, self.port)
        } else {
            format!("{}:{}", self.bind_host, self.port)
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 8080,
            max_connections: 10_000,
        }
    }
}

/// Which selection policy routes new connections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    RoundRobin,
    Geographic,
}

impl std::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyKind::RoundRobin => write!(f, "round_robin"),
            PolicyKind::Geographic => write!(f, "geographic"),
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable active health checks.
    pub enabled: bool,

    /// Probe interval in milliseconds.
    pub interval_ms: u64,

    /// Per-probe timeout in milliseconds.
    pub timeout_ms: u64,

    /// Number of consecutive probe failures before marking unhealthy.
    pub unhealthy_threshold: u32,
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 5_000,
            timeout_ms: 1_000,
            unhealthy_threshold: 3,
        }
    }
}

/// Passive failure detection from live connect attempts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PassiveHealthConfig {
    /// Consecutive connect failures before marking unhealthy.
    pub failure_threshold: u32,
}

impl Default for PassiveHealthConfig {
    fn default() -> Self {
        Self { failure_threshold: 3 }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Backend connection establishment timeout in milliseconds.
    pub connect_ms: u64,

    /// How long in-flight sessions may drain after shutdown, in seconds.
    pub shutdown_secs: u64,
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    pub fn shutdown(&self) -> Duration {
        Duration::from_secs(self.shutdown_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 2_000,
            shutdown_secs: 30,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Extra selection+connect attempts after a failed backend connect.
    pub max_connect_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_connect_retries: 1 }
    }
}

/// What geographic selection does when a client cannot be located.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoFallback {
    /// Refuse the connection (`OriginUnavailable`).
    #[default]
    Reject,
    /// Pick round-robin among healthy backends.
    RoundRobin,
}

/// Geographic routing configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GeoConfig {
    pub fallback: GeoFallback,

    /// Static client address blocks and where they are.
    pub origins: Vec<GeoOriginConfig>,
}

/// One client address block for the static geo resolver.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeoOriginConfig {
    /// Address block, e.g. "10.0.0.0/8".
    pub cidr: String,

    #[serde(default)]
    pub latitude: Option<f64>,

    #[serde(default)]
    pub longitude: Option<f64>,

    #[serde(default)]
    pub region: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// One parsed server-list record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendDescriptor {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub location: Option<GeoLocation>,
}

impl BackendDescriptor {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            location: None,
        }
    }

    pub fn with_location(mut self, location: GeoLocation) -> Self {
        self.location = Some(location);
        self
    }
}
