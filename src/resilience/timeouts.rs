//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap backend connects with a deadline
//! - Cancel the pending connect cleanly on timeout
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - A timeout surfaces as `io::ErrorKind::TimedOut` so callers treat it like
//!   any other failed connect

use std::io;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time;

use crate::error::BalancerError;
use crate::load_balancer::Backend;

/// Connect to `backend`, giving up after `limit`.
pub async fn connect_with_timeout(
    backend: &Backend,
    limit: Duration,
) -> Result<TcpStream, BalancerError> {
    let attempt = TcpStream::connect((backend.host(), backend.port()));
    let source = match time::timeout(limit, attempt).await {
        Ok(Ok(stream)) => return Ok(stream),
        Ok(Err(e)) => e,
        Err(_) => io::Error::new(
            io::ErrorKind::TimedOut,
            format!("connect timed out after {}ms", limit.as_millis()),
        ),
    };
    Err(BalancerError::BackendConnect {
        backend: backend.address(),
        source,
    })
}
