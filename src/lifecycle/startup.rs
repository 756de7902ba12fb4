//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the backend pool from the server list
//! - Initialize subsystems in dependency order
//! - Start background tasks (health checks, metrics)
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: an empty or malformed backend set aborts before any socket is opened
//! - Subsystems initialize in order, not concurrently
//! - Listener starts last (traffic only when ready)

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use crate::config::{
    load_server_list, BackendDescriptor, BalancerConfig, GeoConfig, GeoFallback, PolicyKind,
};
use crate::dispatcher::{DispatchSettings, DispatchSummary, Dispatcher};
use crate::error::Result;
use crate::geo::StaticGeoResolver;
use crate::health::HealthMonitor;
use crate::lifecycle::shutdown::Shutdown;
use crate::load_balancer::{build_policy, BackendPool, HealthThresholds};
use crate::net::Listener;
use crate::observability::metrics;

/// A fully initialized balancer, bound and ready to serve.
pub struct Balancer {
    config: BalancerConfig,
    pool: Arc<BackendPool>,
    dispatcher: Dispatcher,
    listener: Listener,
}

/// Build every subsystem and bind the listener.
///
/// The configuration is taken as already validated.
pub async fn start(config: BalancerConfig, backends: Vec<BackendDescriptor>) -> Result<Balancer> {
    let pool = BackendPool::load(backends)?.with_thresholds(HealthThresholds {
        probe_failures: config.health_check.unhealthy_threshold,
        connect_failures: config.passive.failure_threshold,
    });
    let pool = Arc::new(pool);

    let policy = build_policy(config.policy, &config.geo);
    let mut dispatcher = Dispatcher::new(
        pool.clone(),
        policy,
        DispatchSettings::from_config(&config),
    );
    if config.policy == PolicyKind::Geographic {
        let resolver = StaticGeoResolver::from_config(&config.geo.origins)?;
        tracing::info!(origins = resolver.len(), "Geo resolver loaded");
        if refuses_every_client(&config.geo, &resolver) {
            tracing::warn!(
                "Geographic policy has no origin table and rejects unlocated clients; \
                 every client will be refused"
            );
        }
        dispatcher = dispatcher.with_geo_resolver(Arc::new(resolver));
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }
    for backend in pool.backends() {
        metrics::record_backend_health(&backend.address(), backend.is_healthy());
    }

    let listener = Listener::bind(&config.listener).await?;

    Ok(Balancer {
        config,
        pool,
        dispatcher,
        listener,
    })
}

/// Geographic routing that can locate no client and refuses unlocated ones.
fn refuses_every_client(geo: &GeoConfig, resolver: &StaticGeoResolver) -> bool {
    resolver.is_empty() && geo.fallback == GeoFallback::Reject
}

impl Balancer {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn pool(&self) -> &Arc<BackendPool> {
        &self.pool
    }

    /// Run the health monitor and dispatcher until `shutdown` fires and
    /// sessions have drained.
    pub async fn serve(self, shutdown: &Shutdown) -> Result<DispatchSummary> {
        let Balancer {
            config,
            pool,
            dispatcher,
            listener,
        } = self;

        let monitor = HealthMonitor::new(pool, config.health_check.clone());
        let monitor = tokio::spawn(monitor.run(shutdown.subscribe()));

        let summary = dispatcher.run(listener, shutdown.subscribe()).await;

        // A listener failure ends the dispatcher without a shutdown signal.
        shutdown.trigger();
        if let Err(e) = monitor.await {
            tracing::error!(error = %e, "Health monitor task failed");
        }
        summary
    }
}

/// Load the server list, start, and serve until shutdown.
pub async fn run(
    config: BalancerConfig,
    servers: &Path,
    shutdown: &Shutdown,
) -> Result<DispatchSummary> {
    let backends = load_server_list(servers)?;
    start(config, backends).await?.serve(shutdown).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeoOriginConfig;

    #[test]
    fn empty_origin_table_with_reject_refuses_everyone() {
        let geo = GeoConfig::default();
        let resolver = StaticGeoResolver::from_config(&geo.origins).unwrap();
        assert!(refuses_every_client(&geo, &resolver));
    }

    #[test]
    fn fallback_or_origins_keep_clients_routable() {
        let mut geo = GeoConfig {
            fallback: GeoFallback::RoundRobin,
            ..GeoConfig::default()
        };
        let resolver = StaticGeoResolver::from_config(&geo.origins).unwrap();
        assert!(!refuses_every_client(&geo, &resolver));

        geo.fallback = GeoFallback::Reject;
        geo.origins.push(GeoOriginConfig {
            cidr: "10.0.0.0/8".into(),
            latitude: None,
            longitude: None,
            region: Some("eu-west".into()),
        });
        let resolver = StaticGeoResolver::from_config(&geo.origins).unwrap();
        assert!(!refuses_every_client(&geo, &resolver));
    }
}
