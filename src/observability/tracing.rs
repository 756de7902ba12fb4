//! Per-connection spans.
//!
//! Every event logged while a client is being routed or relayed carries the
//! connection id and peer address through these spans.

use std::net::SocketAddr;

use ::tracing::Span;

use crate::net::connection::ConnectionId;

/// Span covering one client connection from accept to close.
pub fn session_span(id: ConnectionId, peer: SocketAddr) -> Span {
    ::tracing::info_span!("session", connection_id = %id, peer = %peer)
}
