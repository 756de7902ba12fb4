//! Accept loop and per-connection routing.
//!
//! # Responsibilities
//! - Accept clients without ever blocking on a backend
//! - Pick a backend via the configured policy
//! - Connect with a bounded timeout and bounded retry on other backends
//! - Relay the session and report its outcome
//! - Stop accepting on shutdown and drain in-flight sessions

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tokio::time;
use tracing::Instrument;

use crate::config::BalancerConfig;
use crate::error::{BalancerError, Result};
use crate::geo::{ClientOrigin, GeoResolver};
use crate::lifecycle::shutdown::{drain, DrainReport, ShutdownSignal};
use crate::load_balancer::{BackendPool, BackendRef, BackendStats, SelectionPolicy};
use crate::net::{ConnectionId, ConnectionTracker, Listener, ListenerError};
use crate::observability::{metrics, tracing::session_span};
use crate::proxy::Session;
use crate::resilience::{connect_with_timeout, ConnectAttempts};

/// Pause after a failed accept so a persistent error (e.g. fd exhaustion)
/// does not spin the loop.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Knobs for routing and shutdown.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub connect_timeout: Duration,
    pub max_connect_retries: u32,
    pub shutdown_timeout: Duration,
}

impl DispatchSettings {
    pub fn from_config(config: &BalancerConfig) -> Self {
        Self {
            connect_timeout: config.timeouts.connect(),
            max_connect_retries: config.retries.max_connect_retries,
            shutdown_timeout: config.timeouts.shutdown(),
        }
    }
}

/// What happened over the dispatcher's lifetime.
#[derive(Debug, Clone, Default)]
pub struct DispatchSummary {
    pub accepted: u64,
    pub drain: DrainReport,
    /// Per-backend counters at the moment the drain finished.
    pub backends: Vec<BackendStats>,
}

/// Routes accepted clients to backends.
#[derive(Debug)]
pub struct Dispatcher {
    router: Router,
    tracker: ConnectionTracker,
}

/// State every connection task shares.
#[derive(Debug)]
struct Router {
    pool: Arc<BackendPool>,
    policy: Arc<dyn SelectionPolicy>,
    resolver: Option<Arc<dyn GeoResolver>>,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(
        pool: Arc<BackendPool>,
        policy: Arc<dyn SelectionPolicy>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            router: Router {
                pool,
                policy,
                resolver: None,
                settings,
            },
            tracker: ConnectionTracker::new(),
        }
    }

    /// Resolve client locations with `resolver` for policies that need them.
    pub fn with_geo_resolver(mut self, resolver: Arc<dyn GeoResolver>) -> Self {
        self.router.resolver = Some(resolver);
        self
    }

    /// Accept until shutdown, then drain.
    ///
    /// The listener is dropped as soon as shutdown is observed, so new clients
    /// are refused while existing sessions finish.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: ShutdownSignal,
    ) -> Result<DispatchSummary> {
        let router = Arc::new(self.router);
        let tracker = self.tracker;
        tracing::info!(
            policy = router.policy.name(),
            backends = router.pool.len(),
            "Dispatcher started"
        );

        let mut sessions = JoinSet::new();
        let mut fatal = None;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.recv() => {
                    tracing::info!("Dispatcher received shutdown signal, no longer accepting");
                    break;
                }

                Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            tracing::error!(error = %e, "Session task panicked");
                        }
                    }
                }

                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        metrics::record_connection_accepted();
                        let connection = tracker.track();
                        let id = connection.id();
                        let router = router.clone();
                        sessions.spawn(
                            async move {
                                let _permit = permit;
                                let _connection = connection;
                                router.handle(id, stream, peer).await;
                            }
                            .instrument(session_span(id, peer)),
                        );
                    }
                    Err(ListenerError::Accept(e)) => {
                        tracing::warn!(error = %e, "Accept failed");
                        time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Listener failed");
                        fatal = Some(e);
                        break;
                    }
                },
            }
        }

        drop(listener);

        let in_flight = sessions.len();
        if in_flight > 0 {
            tracing::info!(
                in_flight,
                timeout_secs = router.settings.shutdown_timeout.as_secs(),
                "Draining sessions"
            );
        }
        let drained = drain(&mut sessions, router.settings.shutdown_timeout).await;

        let summary = DispatchSummary {
            accepted: tracker.total_count(),
            drain: drained,
            backends: router.pool.stats(),
        };
        for stats in &summary.backends {
            tracing::info!(
                backend = %stats.address,
                state = %stats.state,
                total_connections = stats.total_connections,
                failed_connects = stats.failed_connects,
                "Backend totals"
            );
        }
        tracing::info!(
            accepted = summary.accepted,
            drained = drained.completed,
            aborted = drained.aborted,
            "Dispatcher stopped"
        );

        match fatal {
            Some(e) => Err(BalancerError::Listener(e)),
            None => Ok(summary),
        }
    }
}

impl Router {
    async fn handle(&self, id: ConnectionId, client: TcpStream, peer: SocketAddr) {
        let Some((backend, upstream)) = self.connect(peer).await else {
            // Dropping the client closes it.
            return;
        };

        tracing::debug!(backend = %backend, "Session started");
        let report = Session::new(id, peer, client, &backend, upstream).run().await;

        let duration_ms = report.duration.as_millis() as u64;
        let relay = &report.relay;
        if relay.is_clean() {
            tracing::info!(
                backend = %report.backend,
                bytes_in = relay.client_to_backend,
                bytes_out = relay.backend_to_client,
                duration_ms,
                "Session closed"
            );
            return;
        }
        for e in relay.errors() {
            tracing::warn!(
                backend = %report.backend,
                bytes_in = relay.client_to_backend,
                bytes_out = relay.backend_to_client,
                duration_ms,
                direction = %e.direction,
                error = %e.source,
                "Session ended with relay error"
            );
        }
    }

    fn origin(&self, peer: SocketAddr) -> Option<ClientOrigin> {
        if !self.policy.requires_origin() {
            return None;
        }
        Some(match &self.resolver {
            Some(resolver) => resolver.origin(peer),
            None => ClientOrigin::new(peer),
        })
    }

    /// Select and connect, retrying on other backends within the budget.
    async fn connect(&self, peer: SocketAddr) -> Option<(BackendRef, TcpStream)> {
        let origin = self.origin(peer);
        let mut attempts = ConnectAttempts::new(self.settings.max_connect_retries);

        loop {
            let candidates = attempts.exclude_failed(&self.pool.healthy_snapshot());
            let backend = match self.policy.choose_from(&candidates, origin.as_ref()) {
                Ok(backend) => backend,
                Err(e) => {
                    let reason = match e {
                        BalancerError::NoHealthyBackend if attempts.failures() > 0 => {
                            "connect_failed"
                        }
                        BalancerError::NoHealthyBackend => "no_healthy_backend",
                        BalancerError::OriginUnavailable => "origin_unavailable",
                        _ => "selection_error",
                    };
                    tracing::warn!(error = %e, reason, "Closing client without a backend");
                    metrics::record_selection_failure(reason);
                    return None;
                }
            };

            match connect_with_timeout(&backend, self.settings.connect_timeout).await {
                Ok(stream) => {
                    self.pool.record_connection_outcome(&backend, true);
                    metrics::record_backend_connect(&backend.address(), true);
                    return Some((backend, stream));
                }
                Err(e) => {
                    self.pool.record_connection_outcome(&backend, false);
                    metrics::record_backend_connect(&backend.address(), false);
                    tracing::warn!(error = %e, "Backend connect failed");
                    if !attempts.record_failure(&backend) {
                        tracing::warn!(
                            attempts = attempts.failures(),
                            "Connect retries exhausted, closing client"
                        );
                        metrics::record_selection_failure("connect_failed");
                        return None;
                    }
                }
            }
        }
    }
}
