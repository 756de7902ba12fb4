//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (port range, timeouts > 0, thresholds >= 1)
//! - Check geo origin blocks are well formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BalancerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::BalancerConfig;
use crate::geo::StaticGeoResolver;

/// Lowest port a balancer may listen on.
pub const MIN_LISTEN_PORT: u16 = 1024;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check a loaded configuration for semantic problems.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.port < MIN_LISTEN_PORT {
        errors.push(ValidationError::new(
            "listener.port",
            format!("must be in range [{MIN_LISTEN_PORT},65535], got {}", config.listener.port),
        ));
    }
    if config.listener.bind_host.trim().is_empty() {
        errors.push(ValidationError::new("listener.bind_host", "must not be empty"));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be > 0"));
    }

    let health = &config.health_check;
    if health.interval_ms == 0 {
        errors.push(ValidationError::new("health_check.interval_ms", "must be > 0"));
    }
    if health.timeout_ms == 0 {
        errors.push(ValidationError::new("health_check.timeout_ms", "must be > 0"));
    }
    if health.unhealthy_threshold == 0 {
        errors.push(ValidationError::new("health_check.unhealthy_threshold", "must be >= 1"));
    }
    if config.passive.failure_threshold == 0 {
        errors.push(ValidationError::new("passive.failure_threshold", "must be >= 1"));
    }

    if config.timeouts.connect_ms == 0 {
        errors.push(ValidationError::new("timeouts.connect_ms", "must be > 0"));
    }

    if let Err(e) = StaticGeoResolver::from_config(&config.geo.origins) {
        errors.push(ValidationError::new("geo.origins", e.to_string()));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("not a socket address: {}", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeoOriginConfig;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&BalancerConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = BalancerConfig::default();
        config.listener.port = 1023;
        config.health_check.interval_ms = 0;
        config.health_check.unhealthy_threshold = 0;
        config.timeouts.connect_ms = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.port",
                "health_check.interval_ms",
                "health_check.unhealthy_threshold",
                "timeouts.connect_ms",
            ]
        );
    }

    #[test]
    fn port_boundaries() {
        let mut config = BalancerConfig::default();
        config.listener.port = 1024;
        assert!(validate_config(&config).is_ok());
        config.listener.port = 65535;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn bad_geo_origin_is_reported() {
        let mut config = BalancerConfig::default();
        config.geo.origins.push(GeoOriginConfig {
            cidr: "not-a-cidr".into(),
            latitude: None,
            longitude: None,
            region: Some("x".into()),
        });
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "geo.origins");
    }
}
