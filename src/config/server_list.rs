//! Server-list file parsing.
//!
//! One backend per line:
//!
//! ```text
//! # host:port   [lat,lon]        [region]
//! 10.0.0.1:8080 40.4406,-79.9959 us-east
//! 10.0.0.2:8080 eu-west
//! [::1]:9000
//! ```
//!
//! Blank lines and `#` comments are skipped. Malformed and duplicate records
//! are rejected here so the pool only ever sees a clean, ordered list.

use std::collections::HashSet;
use std::path::Path;

use crate::config::loader::{read_file, ConfigError};
use crate::config::schema::BackendDescriptor;
use crate::geo::{Coordinates, GeoLocation};

/// Read and parse a server-list file.
pub fn load_server_list(path: &Path) -> Result<Vec<BackendDescriptor>, ConfigError> {
    let content = read_file(path)?;
    let backends = parse_server_list(&content)?;
    tracing::debug!(path = ?path, backends = backends.len(), "Server list parsed");
    Ok(backends)
}

/// Parse server-list text into ordered backend descriptors.
pub fn parse_server_list(content: &str) -> Result<Vec<BackendDescriptor>, ConfigError> {
    let mut seen = HashSet::new();
    let mut backends = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = match raw.split_once('#') {
            Some((before, _)) => before,
            None => raw,
        }
        .trim();
        if line.is_empty() {
            continue;
        }

        let descriptor = parse_record(line).map_err(|reason| ConfigError::ServerList {
            line: line_no,
            reason,
        })?;

        if !seen.insert((descriptor.host.to_ascii_lowercase(), descriptor.port)) {
            return Err(ConfigError::DuplicateBackend {
                host: descriptor.host,
                port: descriptor.port,
            });
        }
        backends.push(descriptor);
    }

    Ok(backends)
}

fn parse_record(line: &str) -> Result<BackendDescriptor, String> {
    let mut fields = line.split_whitespace();
    let endpoint = fields.next().ok_or("empty record")?;
    let (host, port) = parse_endpoint(endpoint)?;

    let mut location = GeoLocation::default();
    for field in fields {
        if location.region.is_some() {
            return Err(format!("unexpected field '{field}'"));
        }
        if field.contains(',') && location.coordinates.is_none() {
            location.coordinates = Some(parse_coordinates(field)?);
        } else {
            location.region = Some(field.to_string());
        }
    }

    let descriptor = BackendDescriptor::new(host, port);
    Ok(if location.is_empty() {
        descriptor
    } else {
        descriptor.with_location(location)
    })
}

fn parse_endpoint(endpoint: &str) -> Result<(String, u16), String> {
    let (host, port) = endpoint
        .rsplit_once(':')
        .ok_or_else(|| format!("expected host:port, got '{endpoint}'"))?;

    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    if host.is_empty() {
        return Err(format!("missing host in '{endpoint}'"));
    }
    if host.contains(':') && !endpoint.starts_with('[') {
        return Err(format!("IPv6 hosts must be bracketed: '{endpoint}'"));
    }

    let port: u16 = port
        .parse()
        .map_err(|_| format!("invalid port '{port}'"))?;
    if port == 0 {
        return Err("port must be non-zero".to_string());
    }

    Ok((host.to_string(), port))
}

fn parse_coordinates(field: &str) -> Result<Coordinates, String> {
    let (lat, lon) = field
        .split_once(',')
        .ok_or_else(|| format!("invalid coordinates '{field}'"))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("invalid latitude '{lat}'"))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|_| format!("invalid longitude '{lon}'"))?;
    Coordinates::new(lat, lon).ok_or_else(|| format!("coordinates out of range '{field}'"))
}
