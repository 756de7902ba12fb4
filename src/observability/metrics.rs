//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define balancer metrics (connections, selection failures, relay bytes)
//! - Expose Prometheus-compatible metrics endpoint
//! - Track per-backend and aggregate metrics
//!
//! # Metrics
//! - `balancer_connections_accepted_total` (counter): client connections accepted
//! - `balancer_active_sessions` (gauge): current client connection count
//! - `balancer_selection_failures_total` (counter): clients closed unrouted, by reason
//! - `balancer_backend_connects_total` (counter): connect attempts by backend, outcome
//! - `balancer_relay_bytes_total` (counter): bytes forwarded by backend, direction
//! - `balancer_sessions_total` (counter): finished sessions by backend, outcome
//! - `balancer_backend_health` (gauge): 1=healthy, 0=unhealthy
//!
//! Until [`init_metrics`] installs a recorder every call here is a no-op.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(
            address = %addr,
            error = %e,
            "Failed to install metrics exporter"
        ),
    }
}

pub fn record_connection_accepted() {
    ::metrics::counter!("balancer_connections_accepted_total").increment(1);
}

pub fn set_active_sessions(active: u64) {
    ::metrics::gauge!("balancer_active_sessions").set(active as f64);
}

/// Count a client that was closed without being routed.
pub fn record_selection_failure(reason: &'static str) {
    ::metrics::counter!("balancer_selection_failures_total", "reason" => reason).increment(1);
}

pub fn record_backend_connect(backend: &str, success: bool) {
    let outcome = if success { "ok" } else { "error" };
    ::metrics::counter!(
        "balancer_backend_connects_total",
        "backend" => backend.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_backend_health(backend: &str, healthy: bool) {
    ::metrics::gauge!("balancer_backend_health", "backend" => backend.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

/// Record a finished session's traffic.
pub fn record_relay(backend: &str, client_to_backend: u64, backend_to_client: u64, clean: bool) {
    ::metrics::counter!(
        "balancer_relay_bytes_total",
        "backend" => backend.to_string(),
        "direction" => "client_to_backend"
    )
    .increment(client_to_backend);
    ::metrics::counter!(
        "balancer_relay_bytes_total",
        "backend" => backend.to_string(),
        "direction" => "backend_to_client"
    )
    .increment(backend_to_client);
    ::metrics::counter!(
        "balancer_sessions_total",
        "backend" => backend.to_string(),
        "outcome" => if clean { "clean" } else { "error" }
    )
    .increment(1);
}
