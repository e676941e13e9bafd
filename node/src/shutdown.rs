//! Stop signal shared by the propagator and the quality monitor.
//!
//! Each loop holds its own receiver and only looks at it between units of
//! work: the propagator between log records, the monitor while it sleeps
//! between polls. The supervisor fires the signal on SIGINT/SIGTERM, and
//! also when either loop ends, so the surviving loop winds down before the
//! process exits and is restarted.

use tokio::signal;
use tokio::sync::broadcast;

pub struct ShutdownController {
    tx: broadcast::Sender<()>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// A receiver for one loop. Subscribe before spawning the loop, or a
    /// signal fired in between is missed.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Tell every loop to stop. Firing twice, or with no loop listening,
    /// is harmless.
    pub fn shutdown(&self) {
        let _ = self.tx.send(());
    }

    /// Resolve on the first SIGINT or SIGTERM, after firing the signal.
    ///
    /// This is the only clean way out of the process; see
    /// [`supervise`](crate::supervise).
    pub async fn wait_for_signal(&self) {
        let interrupt = signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    // Still stoppable with SIGINT.
                    tracing::error!(error = %e, "cannot listen for SIGTERM");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        let signal = tokio::select! {
            _ = interrupt => "SIGINT",
            _ = terminate => "SIGTERM",
        };
        tracing::info!(signal, "stopping propagator and monitor");

        self.shutdown();
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}
