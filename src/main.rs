//! tcp-balancer entrypoint.
//!
//! Parses the command line, loads optional tunables, and runs the balancer
//! until SIGINT/SIGTERM.

use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use tcp_balancer::config::{
    load_config, validate_config, BalancerConfig, ConfigError, PolicyKind,
    validation::MIN_LISTEN_PORT,
};
use tcp_balancer::lifecycle::{self, Shutdown};
use tcp_balancer::observability::logging;

#[derive(Parser, Debug)]
#[command(name = "tcp-balancer", version)]
#[command(about = "TCP load balancer with round-robin and geographic routing", long_about = None)]
#[command(group(ArgGroup::new("policy").required(true).args(["geo", "rr"])))]
struct Cli {
    /// Port to accept client connections on.
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(MIN_LISTEN_PORT as i64..))]
    port: u16,

    /// Route each client to the nearest healthy backend.
    #[arg(long)]
    geo: bool,

    /// Rotate through healthy backends.
    #[arg(long)]
    rr: bool,

    /// Server list file, one `host:port [lat,lon] [region]` per line.
    #[arg(short, long)]
    servers: PathBuf,

    /// Optional TOML file with tunables.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn policy(&self) -> PolicyKind {
        if self.geo {
            PolicyKind::Geographic
        } else {
            PolicyKind::RoundRobin
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => BalancerConfig::default(),
    };
    config.listener.port = cli.port;
    config.policy = cli.policy();

    logging::init_logging(&config.observability.log_level);
    tracing::info!("tcp-balancer v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            tracing::error!(%error, "Invalid configuration");
        }
        return Err(ConfigError::Validation(errors).into());
    }

    tracing::info!(
        bind_address = %config.listener.bind_address(),
        policy = %config.policy,
        servers = %cli.servers.display(),
        max_connections = config.listener.max_connections,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    lifecycle::spawn_signal_handler(shutdown.clone());

    let summary = lifecycle::run(config, &cli.servers, &shutdown).await?;

    tracing::info!(
        accepted = summary.accepted,
        aborted = summary.drain.aborted,
        "Shutdown complete"
    );
    Ok(())
}
