//! Bidirectional byte relay between a client and its backend.
//!
//! Each direction copies until its source reports end-of-stream, then
//! half-closes its destination so the peer sees EOF while the opposite
//! direction keeps draining. A leg that fails half-closes its destination the
//! same way and is recorded; the relay ends once both legs have ended. A live
//! byte stream cannot be replayed, so nothing is retried.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

const BUFFER_SIZE: usize = 16 * 1024;

/// Which leg of the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToBackend,
    BackendToClient,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::ClientToBackend => write!(f, "client->backend"),
            Direction::BackendToClient => write!(f, "backend->client"),
        }
    }
}

/// An I/O failure on one leg.
#[derive(Debug, Error)]
#[error("relay {direction} failed: {source}")]
pub struct RelayError {
    pub direction: Direction,
    #[source]
    pub source: io::Error,
}

/// Live byte counts, readable while the relay runs.
#[derive(Debug, Default)]
pub struct RelayCounters {
    client_to_backend: AtomicU64,
    backend_to_client: AtomicU64,
}

impl RelayCounters {
    pub fn client_to_backend(&self) -> u64 {
        self.client_to_backend.load(Ordering::Relaxed)
    }

    pub fn backend_to_client(&self) -> u64 {
        self.backend_to_client.load(Ordering::Relaxed)
    }
}

/// Outcome of a finished relay. Byte counts survive an error.
#[derive(Debug)]
pub struct RelayResult {
    pub client_to_backend: u64,
    pub backend_to_client: u64,
    pub client_to_backend_error: Option<RelayError>,
    pub backend_to_client_error: Option<RelayError>,
}

impl RelayResult {
    pub fn is_clean(&self) -> bool {
        self.client_to_backend_error.is_none() && self.backend_to_client_error.is_none()
    }

    /// Failed legs, client->backend first.
    pub fn errors(&self) -> impl Iterator<Item = &RelayError> {
        self.client_to_backend_error
            .iter()
            .chain(self.backend_to_client_error.iter())
    }

    pub fn total_bytes(&self) -> u64 {
        self.client_to_backend + self.backend_to_client
    }
}

/// Relay until both directions have finished, cleanly or not.
pub async fn relay(client: TcpStream, backend: TcpStream) -> RelayResult {
    let counters = RelayCounters::default();
    relay_counted(client, backend, &counters).await
}

/// Like [`relay`], publishing byte counts into `counters` as data moves.
///
/// Both sockets are owned here and closed when this future completes or is dropped.
pub async fn relay_counted(
    client: TcpStream,
    backend: TcpStream,
    counters: &RelayCounters,
) -> RelayResult {
    let (client_read, client_write) = client.into_split();
    let (backend_read, backend_write) = backend.into_split();

    let (upstream, downstream) = tokio::join!(
        copy_half(client_read, backend_write, &counters.client_to_backend),
        copy_half(backend_read, client_write, &counters.backend_to_client),
    );

    RelayResult {
        client_to_backend: counters.client_to_backend(),
        backend_to_client: counters.backend_to_client(),
        client_to_backend_error: upstream.err().map(leg_error(Direction::ClientToBackend)),
        backend_to_client_error: downstream.err().map(leg_error(Direction::BackendToClient)),
    }
}

fn leg_error(direction: Direction) -> impl FnOnce(io::Error) -> RelayError {
    move |source| RelayError { direction, source }
}

async fn copy_half<R, W>(mut reader: R, mut writer: W, counter: &AtomicU64) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let copied = copy_until_eof(&mut reader, &mut writer, counter).await;

    // Half-close on EOF and on error alike: the peer reads EOF, the other
    // direction stays open.
    let closed = match writer.shutdown().await {
        Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
        other => other,
    };
    copied.and(closed)
}

async fn copy_until_eof<R, W>(reader: &mut R, writer: &mut W, counter: &AtomicU64) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; BUFFER_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        writer.write_all(&buf[..n]).await?;
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }
}
