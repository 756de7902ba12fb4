//! Backend pool management.
//!
//! # Responsibilities
//! - Own the fixed, ordered backend set loaded at startup
//! - Publish a consistent snapshot of healthy backends for selection
//! - Apply health transitions from probes and live connect outcomes

use arc_swap::ArcSwap;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::config::{BackendDescriptor, ConfigError};
use crate::health::passive;
use crate::health::state::HealthState;
use crate::load_balancer::backend::{Backend, BackendRef, BackendStats};
use crate::observability::metrics;

/// Failure streak lengths that flip a backend to Unhealthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthThresholds {
    /// Consecutive failed probes.
    pub probe_failures: u32,
    /// Consecutive failed connects from live traffic.
    pub connect_failures: u32,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            probe_failures: 3,
            connect_failures: 3,
        }
    }
}

/// The fixed backend set and its live health.
#[derive(Debug)]
pub struct BackendPool {
    /// All backends in load order.
    backends: Vec<BackendRef>,
    /// Healthy subset in load order, swapped whole on every transition.
    healthy: ArcSwap<Vec<BackendRef>>,
    /// Serializes snapshot rebuilds. Readers never take it.
    publish: Mutex<()>,
    thresholds: HealthThresholds,
}

impl BackendPool {
    /// Build the pool from parsed server-list records.
    ///
    /// Fails on an empty set or a duplicate `host:port`.
    pub fn load(
        descriptors: impl IntoIterator<Item = BackendDescriptor>,
    ) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        let mut backends = Vec::new();

        for descriptor in descriptors {
            if !seen.insert((descriptor.host.to_ascii_lowercase(), descriptor.port)) {
                return Err(ConfigError::DuplicateBackend {
                    host: descriptor.host,
                    port: descriptor.port,
                });
            }
            backends.push(Arc::new(Backend::new(backends.len(), descriptor)));
        }

        if backends.is_empty() {
            return Err(ConfigError::EmptyBackendSet);
        }

        tracing::info!(backends = backends.len(), "Backend pool loaded");

        Ok(Self {
            healthy: ArcSwap::from_pointee(backends.clone()),
            backends,
            publish: Mutex::new(()),
            thresholds: HealthThresholds::default(),
        })
    }

    pub fn with_thresholds(mut self, thresholds: HealthThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn thresholds(&self) -> HealthThresholds {
        self.thresholds
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Every backend in load order, healthy or not.
    pub fn backends(&self) -> &[BackendRef] {
        &self.backends
    }

    pub fn get(&self, index: usize) -> Option<&BackendRef> {
        self.backends.get(index)
    }

    /// Healthy backends in load order, as of one point in time.
    pub fn healthy_snapshot(&self) -> Arc<Vec<BackendRef>> {
        self.healthy.load_full()
    }

    /// Force a backend out of rotation. Idempotent.
    pub fn mark_unhealthy(&self, backend: &Backend, reason: &str) -> bool {
        if !backend.transition(HealthState::Healthy, HealthState::Unhealthy) {
            return false;
        }
        tracing::warn!(backend = %backend, reason, "Backend marked unhealthy");
        self.republish();
        metrics::record_backend_health(&backend.address(), false);
        true
    }

    /// Put a backend back into rotation and clear its failure streaks. Idempotent.
    pub fn mark_healthy(&self, backend: &Backend) -> bool {
        backend.reset_failure_streaks();
        if !backend.transition(HealthState::Unhealthy, HealthState::Healthy) {
            return false;
        }
        tracing::info!(backend = %backend, "Backend recovered");
        self.republish();
        metrics::record_backend_health(&backend.address(), true);
        true
    }

    /// Record the result of a live connect attempt from the dispatcher.
    pub fn record_connection_outcome(&self, backend: &Backend, success: bool) {
        if success {
            backend.record_connect_success();
            return;
        }
        let streak = backend.record_connect_failure();
        if passive::should_eject(backend.health(), streak, self.thresholds.connect_failures) {
            self.mark_unhealthy(backend, "consecutive connect failures");
        }
    }

    /// Record the result of one active probe.
    pub fn record_probe(&self, backend: &Backend, success: bool) {
        if success {
            backend.reset_probe_failures();
            if backend.health().after_probe_success().is_some() {
                self.mark_healthy(backend);
            }
            return;
        }
        let streak = backend.record_probe_failure();
        if backend
            .health()
            .after_failure(streak, self.thresholds.probe_failures)
            .is_some()
        {
            self.mark_unhealthy(backend, "consecutive probe failures");
        }
    }

    pub fn stats(&self) -> Vec<BackendStats> {
        self.backends.iter().map(|b| b.stats()).collect()
    }

    fn republish(&self) {
        let _guard = self.publish.lock().unwrap_or_else(|e| e.into_inner());
        let healthy: Vec<BackendRef> = self
            .backends
            .iter()
            .filter(|b| b.is_healthy())
            .cloned()
            .collect();
        tracing::debug!(
            healthy = healthy.len(),
            total = self.backends.len(),
            "Healthy set updated"
        );
        self.healthy.store(Arc::new(healthy));
    }
}
