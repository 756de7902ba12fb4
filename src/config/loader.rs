//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::schema::BalancerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration and backend-set loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("server list line {line}: {reason}")]
    ServerList { line: usize, reason: String },

    #[error("backend set is empty")]
    EmptyBackendSet,

    #[error("duplicate backend {host}:{port}")]
    DuplicateBackend { host: String, port: u16 },

    #[error("invalid geo origin {cidr}: {reason}")]
    InvalidGeoOrigin { cidr: String, reason: String },
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Read a file, tagging failures with its path.
pub(crate) fn read_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<BalancerConfig, ConfigError> {
    let content = read_file(path)?;
    let config: BalancerConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GeoFallback, PolicyKind};
    use std::io::Write;

    #[test]
    fn loads_partial_file_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
policy = "geographic"

[listener]
port = 9000

[health_check]
interval_ms = 250
unhealthy_threshold = 2

[geo]
fallback = "round_robin"

[[geo.origins]]
cidr = "10.0.0.0/8"
region = "us-east"
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.listener.port, 9000);
        assert_eq!(config.listener.max_connections, 10_000);
        assert_eq!(config.policy, PolicyKind::Geographic);
        assert_eq!(config.health_check.interval_ms, 250);
        assert_eq!(config.health_check.timeout_ms, 1_000);
        assert_eq!(config.geo.fallback, GeoFallback::RoundRobin);
        assert_eq!(config.geo.origins.len(), 1);
        assert_eq!(config.retries.max_connect_retries, 1);
    }

    #[test]
    fn reports_validation_failures() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[listener]\nport = 80\n").unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("listener.port"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
