//! Shared utilities for integration and load testing.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::task::JoinHandle;

use tcp_balancer::config::{BackendDescriptor, BalancerConfig, PolicyKind};
use tcp_balancer::lifecycle::{self, Shutdown};
use tcp_balancer::load_balancer::BackendPool;
use tcp_balancer::{DispatchSummary, Result};

/// Start a backend that echoes every byte back until the client half-closes.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = socket.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
                let _ = writer.shutdown().await;
            });
        }
    });
    addr
}

/// Start a backend that answers every connection with `tag` and closes.
pub async fn start_tagged_backend(tag: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = socket.write_all(tag.as_bytes()).await;
                let _ = socket.shutdown().await;
                // Hold until the peer closes so the tag is never reset away.
                let mut sink = [0u8; 64];
                while matches!(socket.read(&mut sink).await, Ok(n) if n > 0) {}
            });
        }
    });
    addr
}

/// Start a backend that accepts and then stays silent for `hold`.
pub async fn start_silent_backend(hold: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                tokio::time::sleep(hold).await;
                drop(socket);
            });
        }
    });
    addr
}

/// Start a backend whose accept queue is full for `hold`, so new connects
/// to it hang instead of completing or being refused.
pub async fn start_unresponsive_backend(hold: Duration) -> SocketAddr {
    let socket = TcpSocket::new_v4().unwrap();
    socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let listener = socket.listen(0).unwrap();
    let addr = listener.local_addr().unwrap();

    // Never accepted.
    let mut queued = Vec::new();
    for _ in 0..16 {
        match tokio::time::timeout(Duration::from_millis(200), TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => queued.push(stream),
            _ => break,
        }
    }

    tokio::spawn(async move {
        tokio::time::sleep(hold).await;
        drop((listener, queued));
    });
    addr
}

/// An address nothing listens on.
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn descriptor(addr: SocketAddr) -> BackendDescriptor {
    BackendDescriptor::new(addr.ip().to_string(), addr.port())
}

/// Config bound to an ephemeral loopback port with active checks off.
pub fn test_config(policy: PolicyKind) -> BalancerConfig {
    let mut config = BalancerConfig::default();
    config.listener.bind_host = "127.0.0.1".into();
    config.listener.port = 0;
    config.policy = policy;
    config.health_check.enabled = false;
    config.timeouts.connect_ms = 500;
    config.timeouts.shutdown_secs = 5;
    config
}

/// A balancer running in the background.
pub struct TestBalancer {
    pub addr: SocketAddr,
    pub pool: Arc<BackendPool>,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<DispatchSummary>>,
}

impl TestBalancer {
    pub async fn start(config: BalancerConfig, backends: Vec<SocketAddr>) -> Self {
        Self::start_with(config, backends.into_iter().map(descriptor).collect()).await
    }

    pub async fn start_with(config: BalancerConfig, backends: Vec<BackendDescriptor>) -> Self {
        let balancer = lifecycle::start(config, backends).await.unwrap();
        let addr = balancer.local_addr().unwrap();
        let pool = balancer.pool().clone();
        let shutdown = Shutdown::new();
        let trigger = shutdown.clone();
        let handle = tokio::spawn(async move { balancer.serve(&trigger).await });
        Self {
            addr,
            pool,
            shutdown,
            handle,
        }
    }

    pub async fn stop(self) -> DispatchSummary {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(10), self.handle)
            .await
            .expect("balancer did not stop")
            .unwrap()
            .unwrap()
    }
}

/// Connect, optionally send `payload` and half-close, then read to EOF.
pub async fn round_trip(addr: SocketAddr, payload: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    if !payload.is_empty() {
        stream.write_all(payload).await.unwrap();
    }
    stream.shutdown().await.unwrap();
    let mut received = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut received))
        .await
        .expect("read timed out")
        .unwrap();
    received
}
