//! Client origin resolution.

use std::net::{IpAddr, SocketAddr};

use crate::config::{ConfigError, GeoOriginConfig};
use crate::geo::location::{ClientOrigin, Coordinates, GeoLocation};

/// Maps a client address to a location.
pub trait GeoResolver: Send + Sync + std::fmt::Debug {
    fn resolve(&self, ip: IpAddr) -> Option<GeoLocation>;

    /// Build a full origin for an accepted peer.
    fn origin(&self, peer: SocketAddr) -> ClientOrigin {
        match self.resolve(peer.ip()) {
            Some(location) => ClientOrigin::with_location(peer, location),
            None => ClientOrigin::new(peer),
        }
    }
}

/// An address block in CIDR notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cidr {
    network: IpAddr,
    prefix: u8,
}

impl Cidr {
    /// Parse `a.b.c.d/n`, `::1/128` or a bare address (full-length prefix).
    pub fn parse(s: &str) -> Option<Self> {
        let (addr, prefix) = match s.trim().split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix.parse::<u8>().ok()?)),
            None => (s.trim(), None),
        };
        let network: IpAddr = addr.parse().ok()?;
        let max = if network.is_ipv4() { 32 } else { 128 };
        let prefix = prefix.unwrap_or(max);
        if prefix > max {
            return None;
        }
        Some(Self { network, prefix })
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.network, ip.to_canonical()) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let mask = if self.prefix == 0 { 0 } else { u32::MAX << (32 - self.prefix) };
                u32::from(net) & mask == u32::from(ip) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let mask = if self.prefix == 0 { 0 } else { u128::MAX << (128 - self.prefix) };
                u128::from(net) & mask == u128::from(ip) & mask
            }
            _ => false,
        }
    }
}

/// Resolver backed by a fixed table of address blocks.
///
/// The most specific (longest prefix) matching block wins.
#[derive(Debug, Default)]
pub struct StaticGeoResolver {
    entries: Vec<(Cidr, GeoLocation)>,
}

impl StaticGeoResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cidr: Cidr, location: GeoLocation) {
        self.entries.push((cidr, location));
    }

    pub fn from_config(origins: &[GeoOriginConfig]) -> Result<Self, ConfigError> {
        let mut resolver = Self::new();
        for origin in origins {
            let cidr = Cidr::parse(&origin.cidr).ok_or_else(|| ConfigError::InvalidGeoOrigin {
                cidr: origin.cidr.clone(),
                reason: "not a valid CIDR block".to_string(),
            })?;
            let coordinates = match (origin.latitude, origin.longitude) {
                (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon).ok_or_else(|| {
                    ConfigError::InvalidGeoOrigin {
                        cidr: origin.cidr.clone(),
                        reason: format!("coordinates out of range: {lat},{lon}"),
                    }
                })?),
                (None, None) => None,
                _ => {
                    return Err(ConfigError::InvalidGeoOrigin {
                        cidr: origin.cidr.clone(),
                        reason: "latitude and longitude must be given together".to_string(),
                    })
                }
            };
            let location = GeoLocation {
                coordinates,
                region: origin.region.clone(),
            };
            if location.is_empty() {
                return Err(ConfigError::InvalidGeoOrigin {
                    cidr: origin.cidr.clone(),
                    reason: "needs coordinates or a region".to_string(),
                });
            }
            resolver.insert(cidr, location);
        }
        Ok(resolver)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl GeoResolver for StaticGeoResolver {
    fn resolve(&self, ip: IpAddr) -> Option<GeoLocation> {
        self.entries
            .iter()
            .filter(|(cidr, _)| cidr.contains(ip))
            .max_by_key(|(cidr, _)| cidr.prefix())
            .map(|(_, location)| location.clone())
    }
}
