//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGINT (Ctrl+C) or SIGTERM
//! - Translate the first one into a shutdown trigger
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Non-unix targets only listen for Ctrl+C

use std::io;

use crate::lifecycle::shutdown::Shutdown;

/// Resolve once the process is asked to terminate.
#[cfg(unix)]
pub async fn wait_for_termination() -> io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

/// Resolve once the process is asked to terminate.
#[cfg(not(unix))]
pub async fn wait_for_termination() -> io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Trigger `shutdown` on the first termination signal.
pub fn spawn_signal_handler(shutdown: Shutdown) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match wait_for_termination().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signals"),
        }
        shutdown.trigger();
    })
}
