//! Geographic data used by proximity routing.
//!
//! # Data Flow
//! ```text
//! Server list → backend GeoLocation (coordinates and/or region)
//! Accepted peer → resolver.rs (GeoResolver) → ClientOrigin
//!     → load_balancer::geographic ranks backends by distance
//! ```

pub mod location;
pub mod resolver;

pub use location::{ClientOrigin, Coordinates, GeoLocation};
pub use resolver::{Cidr, GeoResolver, StaticGeoResolver};
