//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server and its load-order position
//! - Track active/total connections and failed connects
//! - Track health state (Healthy/Unhealthy) and failure streaks

use serde::Serialize;
use std::ops::Deref;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::BackendDescriptor;
use crate::geo::GeoLocation;
use crate::health::state::HealthState;

/// Shared handle to a pooled backend.
pub type BackendRef = Arc<Backend>;

/// A single backend server.
#[derive(Debug)]
pub struct Backend {
    /// Position in the server list.
    index: usize,
    host: String,
    port: u16,
    location: Option<GeoLocation>,

    /// Current health state (see `HealthState`).
    state: AtomicU8,
    /// Number of currently relayed sessions.
    active_connections: AtomicUsize,
    /// Successful backend connects over the process lifetime.
    total_connections: AtomicU64,
    /// Failed backend connects over the process lifetime.
    failed_connects: AtomicU64,
    /// Consecutive failed probes.
    probe_failures: AtomicU32,
    /// Consecutive failed connects from live traffic.
    connect_failures: AtomicU32,
}

impl Backend {
    /// Create a healthy backend at `index` in load order.
    pub fn new(index: usize, descriptor: BackendDescriptor) -> Self {
        Self {
            index,
            host: descriptor.host,
            port: descriptor.port,
            location: descriptor.location,
            state: AtomicU8::new(HealthState::Healthy as u8),
            active_connections: AtomicUsize::new(0),
            total_connections: AtomicU64::new(0),
            failed_connects: AtomicU64::new(0),
            probe_failures: AtomicU32::new(0),
            connect_failures: AtomicU32::new(0),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn location(&self) -> Option<&GeoLocation> {
        self.location.as_ref()
    }

    /// `host:port`, bracketing IPv6 literals.
    pub fn address(&self) -> String {
        self.to_string()
    }

    pub fn health(&self) -> HealthState {
        HealthState::from(self.state.load(Ordering::Acquire))
    }

    pub fn is_healthy(&self) -> bool {
        self.health().is_healthy()
    }

    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    pub fn total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::Relaxed)
    }

    pub fn failed_connects(&self) -> u64 {
        self.failed_connects.load(Ordering::Relaxed)
    }

    pub fn consecutive_probe_failures(&self) -> u32 {
        self.probe_failures.load(Ordering::Relaxed)
    }

    pub fn consecutive_connect_failures(&self) -> u32 {
        self.connect_failures.load(Ordering::Relaxed)
    }

    /// Start counting a relayed session. The guard decrements on drop.
    pub fn track_connection(self: &Arc<Self>) -> BackendConnectionGuard {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        BackendConnectionGuard {
            backend: Arc::clone(self),
        }
    }

    pub fn stats(&self) -> BackendStats {
        BackendStats {
            index: self.index,
            address: self.address(),
            state: self.health(),
            active_connections: self.active_connections(),
            total_connections: self.total_connections(),
            failed_connects: self.failed_connects(),
        }
    }

    // --- Health bookkeeping, driven by BackendPool ---

    /// Atomically move `from` → `to`. Returns false if another caller got there first.
    pub(crate) fn transition(&self, from: HealthState, to: HealthState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn record_probe_failure(&self) -> u32 {
        self.probe_failures.fetch_add(1, Ordering::Relaxed).saturating_add(1)
    }

    pub(crate) fn reset_probe_failures(&self) {
        self.probe_failures.store(0, Ordering::Relaxed);
    }

    pub(crate) fn record_connect_success(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.connect_failures.store(0, Ordering::Relaxed);
    }

    pub(crate) fn record_connect_failure(&self) -> u32 {
        self.failed_connects.fetch_add(1, Ordering::Relaxed);
        self.connect_failures.fetch_add(1, Ordering::Relaxed).saturating_add(1)
    }

    pub(crate) fn reset_failure_streaks(&self) {
        self.probe_failures.store(0, Ordering::Relaxed);
        self.connect_failures.store(0, Ordering::Relaxed);
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Point-in-time counters for one backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendStats {
    pub index: usize,
    pub address: String,
    pub state: HealthState,
    pub active_connections: usize,
    pub total_connections: u64,
    pub failed_connects: u64,
}

/// A RAII guard that manages the active connection count.
#[derive(Debug)]
pub struct BackendConnectionGuard {
    backend: BackendRef,
}

impl BackendConnectionGuard {
    pub fn backend(&self) -> &BackendRef {
        &self.backend
    }
}

impl Deref for BackendConnectionGuard {
    type Target = Backend;
    fn deref(&self) -> &Self::Target {
        &self.backend
    }
}

impl Drop for BackendConnectionGuard {
    fn drop(&mut self) {
        self.backend.active_connections.fetch_sub(1, Ordering::Relaxed);
    }
}
