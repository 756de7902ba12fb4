//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every backend, unhealthy ones included
//! - Run probes concurrently, each under its own timeout
//! - Update backend health state based on results

use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::lifecycle::ShutdownSignal;
use crate::load_balancer::{Backend, BackendPool, BackendRef};

/// A connectivity check against one backend.
pub trait Probe: Send + Sync + 'static {
    fn probe(&self, backend: &Backend) -> impl Future<Output = std::io::Result<()>> + Send;
}

/// Connect, then close straight away.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpProbe;

impl Probe for TcpProbe {
    async fn probe(&self, backend: &Backend) -> std::io::Result<()> {
        let stream = TcpStream::connect((backend.host(), backend.port())).await?;
        drop(stream);
        Ok(())
    }
}

/// Why a probe counted as failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    Error(String),
    Timeout,
    Panicked,
}

/// Result of probing one backend.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub backend: BackendRef,
    pub result: Result<(), ProbeFailure>,
}

impl ProbeOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

pub struct HealthMonitor<P: Probe = TcpProbe> {
    pool: Arc<BackendPool>,
    config: HealthCheckConfig,
    probe: Arc<P>,
}

impl HealthMonitor<TcpProbe> {
    pub fn new(pool: Arc<BackendPool>, config: HealthCheckConfig) -> Self {
        Self::with_probe(pool, config, TcpProbe)
    }
}

impl<P: Probe> HealthMonitor<P> {
    pub fn with_probe(pool: Arc<BackendPool>, config: HealthCheckConfig, probe: P) -> Self {
        Self {
            pool,
            config,
            probe: Arc::new(probe),
        }
    }

    pub async fn run(self, mut shutdown: ShutdownSignal) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval_ms = self.config.interval_ms,
            timeout_ms = self.config.timeout_ms,
            threshold = self.config.unhealthy_threshold,
            "Health monitor starting"
        );

        let mut ticker = time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every backend once and apply the results to the pool.
    pub async fn check_all(&self) -> Vec<ProbeOutcome> {
        let timeout = self.config.timeout();

        // Spawn first so all probes are in flight together.
        let pending: Vec<_> = self
            .pool
            .backends()
            .iter()
            .map(|backend| {
                let probe = self.probe.clone();
                let target = backend.clone();
                let handle = tokio::spawn(async move {
                    time::timeout(timeout, probe.probe(&target)).await
                });
                (backend.clone(), handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(pending.len());
        for (backend, handle) in pending {
            let result = match handle.await {
                Ok(Ok(Ok(()))) => Ok(()),
                Ok(Ok(Err(e))) => {
                    tracing::debug!(
                        backend = %backend,
                        error = %e,
                        "Health check failed: connection error"
                    );
                    Err(ProbeFailure::Error(e.to_string()))
                }
                Ok(Err(_)) => {
                    tracing::debug!(backend = %backend, "Health check failed: timeout");
                    Err(ProbeFailure::Timeout)
                }
                Err(e) => {
                    tracing::error!(backend = %backend, error = %e, "Health probe task failed");
                    Err(ProbeFailure::Panicked)
                }
            };

            self.pool.record_probe(&backend, result.is_ok());
            outcomes.push(ProbeOutcome { backend, result });
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendDescriptor;
    use crate::lifecycle::Shutdown;
    use crate::load_balancer::HealthThresholds;
    use std::io;
    use std::time::Duration;
    use tokio::net::TcpListener;

    struct Scripted;

    impl Probe for Scripted {
        async fn probe(&self, backend: &Backend) -> io::Result<()> {
            match backend.host() {
                "ok" => Ok(()),
                "refused" => Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused")),
                "slow" => {
                    time::sleep(Duration::from_secs(60)).await;
                    Ok(())
                }
                _ => panic!("probe blew up"),
            }
        }
    }

    fn config() -> HealthCheckConfig {
        HealthCheckConfig {
            enabled: true,
            interval_ms: 50,
            timeout_ms: 100,
            unhealthy_threshold: 1,
        }
    }

    #[tokio::test]
    async fn failures_of_any_kind_are_contained() {
        let pool = Arc::new(
            BackendPool::load(
                ["ok", "refused", "slow", "boom"]
                    .into_iter()
                    .map(|h| BackendDescriptor::new(h, 80)),
            )
            .unwrap()
            .with_thresholds(HealthThresholds {
                probe_failures: 1,
                connect_failures: 3,
            }),
        );
        let monitor = HealthMonitor::with_probe(pool.clone(), config(), Scripted);

        let started = time::Instant::now();
        let outcomes = monitor.check_all().await;
        assert!(started.elapsed() < Duration::from_secs(5));

        let results: Vec<_> = outcomes.iter().map(|o| o.result.clone()).collect();
        assert_eq!(results[0], Ok(()));
        assert!(matches!(results[1], Err(ProbeFailure::Error(_))));
        assert_eq!(results[2], Err(ProbeFailure::Timeout));
        assert_eq!(results[3], Err(ProbeFailure::Panicked));

        let healthy: Vec<_> = pool
            .healthy_snapshot()
            .iter()
            .map(|b| b.host().to_string())
            .collect();
        assert_eq!(healthy, vec!["ok"]);
    }

    #[tokio::test]
    async fn tcp_probe_tracks_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let pool = Arc::new(
            BackendPool::load(vec![BackendDescriptor::new("127.0.0.1", addr.port())])
                .unwrap()
                .with_thresholds(HealthThresholds {
                    probe_failures: 2,
                    connect_failures: 3,
                }),
        );
        let monitor = HealthMonitor::new(pool.clone(), config());

        assert!(monitor.check_all().await[0].is_success());

        drop(listener);
        monitor.check_all().await;
        assert!(pool.backends()[0].is_healthy());
        monitor.check_all().await;
        assert!(!pool.backends()[0].is_healthy());
        assert!(pool.healthy_snapshot().is_empty());

        let _listener = TcpListener::bind(addr).await.unwrap();
        assert!(monitor.check_all().await[0].is_success());
        assert!(pool.backends()[0].is_healthy());
    }

    #[tokio::test]
    async fn disabled_monitor_returns_immediately() {
        let pool = Arc::new(BackendPool::load(vec![BackendDescriptor::new("ok", 80)]).unwrap());
        let mut cfg = config();
        cfg.enabled = false;
        let shutdown = Shutdown::new();
        time::timeout(
            Duration::from_secs(1),
            HealthMonitor::with_probe(pool, cfg, Scripted).run(shutdown.subscribe()),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let pool = Arc::new(BackendPool::load(vec![BackendDescriptor::new("ok", 80)]).unwrap());
        let shutdown = Shutdown::new();
        let monitor = HealthMonitor::with_probe(pool, config(), Scripted);
        let task = tokio::spawn(monitor.run(shutdown.subscribe()));
        time::sleep(Duration::from_millis(120)).await;
        shutdown.trigger();
        time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn run_exits_when_shutdown_came_first() {
        let pool = Arc::new(BackendPool::load(vec![BackendDescriptor::new("ok", 80)]).unwrap());
        let shutdown = Shutdown::new();
        shutdown.trigger();
        time::timeout(
            Duration::from_secs(1),
            HealthMonitor::with_probe(pool, config(), Scripted).run(shutdown.subscribe()),
        )
        .await
        .unwrap();
    }
}
