//! Failure injection tests for the balancer.

use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use tcp_balancer::config::{ConfigError, PolicyKind};
use tcp_balancer::lifecycle::{self, Shutdown};
use tcp_balancer::BalancerError;

mod common;
use common::TestBalancer;

#[tokio::test]
async fn refused_backend_is_skipped_then_ejected() {
    let dead = common::refused_addr().await;
    let live = common::start_tagged_backend("up").await;
    let mut config = common::test_config(PolicyKind::RoundRobin);
    config.retries.max_connect_retries = 1;
    config.passive.failure_threshold = 3;
    let balancer = TestBalancer::start(config, vec![dead, live]).await;

    for i in 0..6 {
        let reply = common::round_trip(balancer.addr, b"").await;
        assert_eq!(reply, b"up", "connection {i}");
    }

    let dead_backend = &balancer.pool.backends()[0];
    assert!(!dead_backend.is_healthy());
    assert_eq!(dead_backend.failed_connects(), 3);
    assert_eq!(balancer.pool.healthy_snapshot().len(), 1);

    balancer.stop().await;
}

#[tokio::test]
async fn exhausted_retries_close_the_client() {
    let backends = vec![common::refused_addr().await, common::refused_addr().await];
    let mut config = common::test_config(PolicyKind::RoundRobin);
    config.retries.max_connect_retries = 1;
    let balancer = TestBalancer::start(config, backends).await;

    let reply = common::round_trip(balancer.addr, b"").await;
    assert!(reply.is_empty());
    for backend in balancer.pool.backends() {
        assert_eq!(backend.failed_connects(), 1);
    }

    balancer.stop().await;
}

#[tokio::test]
async fn no_healthy_backend_closes_the_client() {
    let backend = common::start_tagged_backend("never").await;
    let config = common::test_config(PolicyKind::RoundRobin);
    let balancer = TestBalancer::start(config, vec![backend]).await;
    let only = balancer.pool.backends()[0].clone();
    assert!(balancer.pool.mark_unhealthy(&only, "test"));

    let reply = common::round_trip(balancer.addr, b"").await;
    assert!(reply.is_empty());
    assert_eq!(only.total_connections(), 0);

    // Back in rotation.
    assert!(balancer.pool.mark_healthy(&only));
    let reply = common::round_trip(balancer.addr, b"").await;
    assert_eq!(reply, b"never");

    balancer.stop().await;
}

#[tokio::test]
async fn active_checks_eject_and_restore_backend() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = common::test_config(PolicyKind::RoundRobin);
    config.health_check.enabled = true;
    config.health_check.interval_ms = 50;
    config.health_check.timeout_ms = 200;
    config.health_check.unhealthy_threshold = 2;
    let balancer = TestBalancer::start(config, vec![addr]).await;

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!balancer.pool.backends()[0].is_healthy());

    // Same port comes back.
    let listener = TcpListener::bind(addr).await.unwrap();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            drop(socket);
        }
    });
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(balancer.pool.backends()[0].is_healthy());

    balancer.stop().await;
}

#[tokio::test]
async fn shutdown_drains_in_flight_sessions() {
    let backend = common::start_echo_backend().await;
    let config = common::test_config(PolicyKind::RoundRobin);
    let balancer = TestBalancer::start(config, vec![backend]).await;

    let mut client = TcpStream::connect(balancer.addr).await.unwrap();
    let mut buf = [0u8; 5];
    client.write_all(b"hello").await.unwrap();
    client.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"hello");

    balancer.shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // No longer accepting.
    assert!(TcpStream::connect(balancer.addr).await.is_err());

    // The existing session still relays.
    client.write_all(b"again").await.unwrap();
    client.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"again");
    client.shutdown().await.unwrap();
    let mut rest = Vec::new();
    client.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());

    let summary = tokio::time::timeout(Duration::from_secs(5), balancer.handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(summary.accepted, 1);
    assert_eq!(summary.drain.completed, 1);
    assert_eq!(summary.drain.aborted, 0);
}

#[tokio::test]
async fn shutdown_before_serve_still_stops() {
    let backend = common::start_echo_backend().await;
    let config = common::test_config(PolicyKind::RoundRobin);
    let balancer = lifecycle::start(config, vec![common::descriptor(backend)])
        .await
        .unwrap();

    // Signal arrives while the balancer is still starting up.
    let shutdown = Shutdown::new();
    shutdown.trigger();

    let summary = tokio::time::timeout(Duration::from_secs(2), balancer.serve(&shutdown))
        .await
        .expect("early shutdown was lost")
        .unwrap();
    assert_eq!(summary.accepted, 0);
}

#[tokio::test]
async fn empty_server_list_fails_before_binding() {
    let mut servers = tempfile::NamedTempFile::new().unwrap();
    writeln!(servers, "# nothing configured yet").unwrap();
    writeln!(servers).unwrap();

    // Occupy the port: reaching bind would surface a listener error instead.
    let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = common::test_config(PolicyKind::RoundRobin);
    config.listener.port = occupied.local_addr().unwrap().port();

    let shutdown = Shutdown::new();
    let err = lifecycle::run(config, servers.path(), &shutdown).await.unwrap_err();
    assert!(matches!(err, BalancerError::Config(ConfigError::EmptyBackendSet)));
}

#[tokio::test]
async fn missing_server_list_is_a_config_error() {
    let shutdown = Shutdown::new();
    let config = common::test_config(PolicyKind::RoundRobin);
    let err = lifecycle::run(config, "/nonexistent/servers.txt".as_ref(), &shutdown)
        .await
        .unwrap_err();
    assert!(matches!(err, BalancerError::Config(ConfigError::Io { .. })));
}
