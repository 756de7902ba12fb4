//! One routed client connection.

use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;

use crate::load_balancer::{BackendConnectionGuard, BackendRef};
use crate::net::connection::ConnectionId;
use crate::observability::metrics;
use crate::proxy::tunnel::{relay_counted, RelayCounters, RelayResult};

/// A client paired with its connected backend, ready to relay.
///
/// Holds the backend's active-connection guard, so the backend's counter
/// drops back as soon as the session is finished or dropped.
#[derive(Debug)]
pub struct Session {
    id: ConnectionId,
    peer: SocketAddr,
    client: TcpStream,
    upstream: TcpStream,
    guard: BackendConnectionGuard,
    counters: RelayCounters,
}

/// Summary of a finished session.
#[derive(Debug)]
pub struct SessionReport {
    pub id: ConnectionId,
    pub peer: SocketAddr,
    pub backend: BackendRef,
    pub relay: RelayResult,
    pub duration: Duration,
}

impl Session {
    pub fn new(
        id: ConnectionId,
        peer: SocketAddr,
        client: TcpStream,
        backend: &BackendRef,
        upstream: TcpStream,
    ) -> Self {
        Self {
            id,
            peer,
            client,
            upstream,
            guard: backend.track_connection(),
            counters: RelayCounters::default(),
        }
    }

    /// Relay until both sides are done, then release the backend slot.
    pub async fn run(self) -> SessionReport {
        let Session {
            id,
            peer,
            client,
            upstream,
            guard,
            counters,
        } = self;
        let started = Instant::now();

        for (side, stream) in [("client", &client), ("backend", &upstream)] {
            if let Err(e) = stream.set_nodelay(true) {
                tracing::debug!(error = %e, side, "Failed to set TCP_NODELAY");
            }
        }

        let relay = relay_counted(client, upstream, &counters).await;
        let backend = guard.backend().clone();
        drop(guard);

        metrics::record_relay(
            &backend.address(),
            relay.client_to_backend,
            relay.backend_to_client,
            relay.is_clean(),
        );

        SessionReport {
            id,
            peer,
            backend,
            relay,
            duration: started.elapsed(),
        }
    }
}
