//! Shutdown coordination for the balancer.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time;

/// Coordinator for graceful shutdown.
///
/// The trigger is a latched flag: a task that subscribes after
/// [`Shutdown::trigger`] still sees it.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger the shutdown signal. Later calls are no-ops.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Get the number of active subscribers (tasks still running).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// One task's view of the shutdown flag.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolve once shutdown is triggered, or at once if it already was.
    ///
    /// A dropped coordinator counts as a trigger. Cancel safe.
    pub async fn recv(&mut self) {
        let _ = self.rx.wait_for(|triggered| *triggered).await;
    }
}

/// How in-flight work ended during a drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Tasks that finished on their own before the deadline.
    pub completed: usize,
    /// Tasks still running at the deadline and aborted.
    pub aborted: usize,
}

/// Wait up to `deadline` for every task in `tasks`, then abort the rest.
pub async fn drain<T: 'static>(tasks: &mut JoinSet<T>, deadline: Duration) -> DrainReport {
    let mut completed = 0;
    let finished = time::timeout(deadline, async {
        while tasks.join_next().await.is_some() {
            completed += 1;
        }
    })
    .await
    .is_ok();

    if finished {
        return DrainReport { completed, aborted: 0 };
    }

    let aborted = tasks.len();
    tracing::warn!(aborted, "Drain deadline reached, aborting remaining tasks");
    tasks.abort_all();
    while tasks.join_next().await.is_some() {}

    DrainReport { completed, aborted }
}
