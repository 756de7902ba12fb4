//! Geographic locations and distance.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Mean Earth radius in kilometres.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Create coordinates, rejecting values outside the valid degree ranges.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        Some(Self { latitude, longitude })
    }

    /// Great-circle distance in kilometres (haversine).
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

/// Where a backend or a client is, as precisely as it is known.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub coordinates: Option<Coordinates>,
    pub region: Option<String>,
}

impl GeoLocation {
    pub fn from_coordinates(coordinates: Coordinates) -> Self {
        Self {
            coordinates: Some(coordinates),
            region: None,
        }
    }

    pub fn from_region(region: impl Into<String>) -> Self {
        Self {
            coordinates: None,
            region: Some(region.into()),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_none() && self.region.is_none()
    }

    /// Distance used for ranking backends.
    ///
    /// Coordinates on both sides give the haversine distance. Otherwise two
    /// equal region labels (case-insensitive) count as co-located. Anything
    /// else is incomparable and returns `None`.
    pub fn distance_to(&self, other: &GeoLocation) -> Option<f64> {
        if let (Some(a), Some(b)) = (&self.coordinates, &other.coordinates) {
            return Some(a.distance_km(b));
        }
        match (&self.region, &other.region) {
            (Some(a), Some(b)) if a.eq_ignore_ascii_case(b) => Some(0.0),
            _ => None,
        }
    }
}

/// The client side of a routing decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientOrigin {
    pub peer: SocketAddr,
    pub location: Option<GeoLocation>,
}

impl ClientOrigin {
    /// Origin without a resolved location.
    pub fn new(peer: SocketAddr) -> Self {
        Self { peer, location: None }
    }

    pub fn with_location(peer: SocketAddr, location: GeoLocation) -> Self {
        Self {
            peer,
            location: Some(location),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_london_paris() {
        let london = Coordinates::new(51.5074, -0.1278).unwrap();
        let paris = Coordinates::new(48.8566, 2.3522).unwrap();
        let d = london.distance_km(&paris);
        assert!((d - 343.5).abs() < 2.0, "got {d}");
        assert!((paris.distance_km(&london) - d).abs() < 1e-9);
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(Coordinates::new(91.0, 0.0).is_none());
        assert!(Coordinates::new(0.0, -181.0).is_none());
        assert!(Coordinates::new(-90.0, 180.0).is_some());
    }

    #[test]
    fn region_match_is_case_insensitive() {
        let a = GeoLocation::from_region("us-east");
        let b = GeoLocation::from_region("US-EAST");
        let c = GeoLocation::from_region("eu-west");
        assert_eq!(a.distance_to(&b), Some(0.0));
        assert_eq!(a.distance_to(&c), None);
    }

    #[test]
    fn coordinates_take_precedence_over_region() {
        let a = GeoLocation::from_coordinates(Coordinates::new(0.0, 0.0).unwrap()).with_region("x");
        let b = GeoLocation::from_coordinates(Coordinates::new(0.0, 1.0).unwrap()).with_region("x");
        let d = a.distance_to(&b).unwrap();
        assert!(d > 100.0);
    }
}
