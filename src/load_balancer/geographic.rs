//! Geographic proximity load balancing strategy.
//!
//! Picks the healthy backend closest to the client. Backends whose location
//! cannot be compared with the client's rank after every comparable one. Ties
//! go to the lowest load-order index, so the same origin and healthy set
//! always produce the same backend.

use std::cmp::Ordering;

use crate::config::GeoFallback;
use crate::error::{BalancerError, Result};
use crate::geo::{ClientOrigin, GeoLocation};
use crate::load_balancer::{BackendRef, RoundRobin, SelectionPolicy};

/// Nearest-backend selector.
#[derive(Debug, Default)]
pub struct Geographic {
    fallback: GeoFallback,
    /// Used only when `fallback` is `RoundRobin` and the origin is unknown.
    unlocated: RoundRobin,
}

impl Geographic {
    pub fn new(fallback: GeoFallback) -> Self {
        Self {
            fallback,
            unlocated: RoundRobin::new(),
        }
    }

    /// Ranking distance; incomparable locations sort last.
    fn distance(origin: &GeoLocation, backend: &BackendRef) -> f64 {
        backend
            .location()
            .and_then(|loc| origin.distance_to(loc))
            .unwrap_or(f64::INFINITY)
    }
}

impl SelectionPolicy for Geographic {
    fn choose_from(
        &self,
        candidates: &[BackendRef],
        origin: Option<&ClientOrigin>,
    ) -> Result<BackendRef> {
        if candidates.is_empty() {
            return Err(BalancerError::NoHealthyBackend);
        }

        let location = match origin.and_then(|o| o.location.as_ref()) {
            Some(location) => location,
            None => {
                return match self.fallback {
                    GeoFallback::Reject => Err(BalancerError::OriginUnavailable),
                    GeoFallback::RoundRobin => {
                        tracing::debug!("Client location unknown, falling back to round-robin");
                        self.unlocated.choose_from(candidates, origin)
                    }
                };
            }
        };

        let mut best: Option<(&BackendRef, f64)> = None;
        for backend in candidates {
            let d = Self::distance(location, backend);
            let closer = match best {
                None => true,
                Some((current, best_d)) => match d.total_cmp(&best_d) {
                    Ordering::Less => true,
                    Ordering::Equal => backend.index() < current.index(),
                    Ordering::Greater => false,
                },
            };
            if closer {
                best = Some((backend, d));
            }
        }

        best.map(|(b, _)| b.clone())
            .ok_or(BalancerError::NoHealthyBackend)
    }

    fn requires_origin(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "geographic"
    }
}
