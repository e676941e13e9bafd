//! Runs the propagator and the quality monitor side by side.
//!
//! Neither task is expected to finish. If either one does, for any reason,
//! the other is told to stop and the process exits with an error so the
//! orchestrator restarts it with a fresh connection to the node and the
//! broker. Only an OS signal ends the process cleanly.

use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};

use peerwarden_broker::{BrokerConfig, KafkaLog};
use peerwarden_network::{
    discover_local_ip, LocalEndpoint, NetworkError, QualityMonitor, TrustedPeerPropagator,
};
use peerwarden_rpc::{IpcClient, NodeAdmin};

use crate::{ManagerConfig, NodeError, ShutdownController};

/// How long a task gets to observe shutdown before it is aborted.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

/// A named, spawned long-running task.
pub struct Unit {
    pub name: &'static str,
    handle: JoinHandle<Result<(), NetworkError>>,
}

impl Unit {
    pub fn new(name: &'static str, handle: JoinHandle<Result<(), NetworkError>>) -> Self {
        Self { name, handle }
    }

    pub fn spawn<F>(name: &'static str, task: F) -> Self
    where
        F: Future<Output = Result<(), NetworkError>> + Send + 'static,
    {
        Self::new(name, tokio::spawn(task))
    }

    /// Wait up to `grace` for the task to finish, then abort it.
    async fn stop(mut self, grace: Duration) {
        match tokio::time::timeout(grace, &mut self.handle).await {
            Ok(_) => tracing::debug!(task = self.name, "task stopped"),
            Err(_) => {
                tracing::warn!(task = self.name, "task ignored shutdown, aborting");
                self.handle.abort();
            }
        }
    }
}

/// Wait until `stop` resolves or either unit ends.
///
/// On `stop` both units are shut down and `Ok(())` is returned. Otherwise
/// the surviving unit is shut down and the ended unit's outcome is returned
/// as an error, even if it returned `Ok`.
pub async fn supervise<S>(
    mut first: Unit,
    mut second: Unit,
    shutdown: &ShutdownController,
    stop: S,
) -> Result<(), NodeError>
where
    S: Future<Output = ()>,
{
    tokio::pin!(stop);

    let ended = tokio::select! {
        _ = &mut stop => None,
        outcome = &mut first.handle => Some((0, outcome)),
        outcome = &mut second.handle => Some((1, outcome)),
    };

    shutdown.shutdown();

    let Some((index, outcome)) = ended else {
        tracing::info!("stopping tasks");
        first.stop(SHUTDOWN_GRACE).await;
        second.stop(SHUTDOWN_GRACE).await;
        return Ok(());
    };

    let (name, survivor) = if index == 0 {
        (first.name, second)
    } else {
        (second.name, first)
    };
    let error = task_error(name, outcome);
    tracing::error!(task = name, error = %error, "task ended, shutting down");
    survivor.stop(SHUTDOWN_GRACE).await;
    Err(error)
}

fn task_error(name: &'static str, outcome: Result<Result<(), NetworkError>, JoinError>) -> NodeError {
    match outcome {
        Ok(Ok(())) => NodeError::TaskExited(name),
        Ok(Err(source)) => NodeError::TaskFailed { task: name, source },
        Err(e) if e.is_panic() => {
            let payload = e.into_panic();
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".into());
            NodeError::TaskPanicked { task: name, message }
        }
        Err(_) => NodeError::TaskExited(name),
    }
}

/// Owns the configuration and shutdown channel for one process lifetime.
pub struct Supervisor {
    config: ManagerConfig,
    shutdown: ShutdownController,
}

impl Supervisor {
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            config,
            shutdown: ShutdownController::new(),
        }
    }

    /// Start both tasks and block until a signal arrives or one of them ends.
    pub async fn run(self) -> Result<(), NodeError> {
        self.config.validate()?;
        tracing::info!(
            ipc_path = %self.config.ipc_path.display(),
            topic = %self.config.topic,
            poll_interval_secs = self.config.poll_interval_secs,
            "starting peerwarden"
        );

        let broker = self.config.broker()?;
        let propagator = Unit::spawn(
            "propagator",
            run_propagator(self.config.clone(), broker, self.shutdown.subscribe()),
        );
        let monitor = Unit::spawn(
            "monitor",
            run_monitor(self.config.clone(), self.shutdown.subscribe()),
        );

        supervise(propagator, monitor, &self.shutdown, self.shutdown.wait_for_signal()).await
    }
}

async fn run_propagator(
    config: ManagerConfig,
    broker: BrokerConfig,
    shutdown: broadcast::Receiver<()>,
) -> Result<(), NetworkError> {
    let client = IpcClient::connect(&config.ipc_path).await;
    let log = KafkaLog::connect(&broker, &config.topic_settings()).await?;

    let ip = match config.advertise_ip {
        Some(ip) => ip,
        None => discover_local_ip().await?,
    };

    let mut propagator = TrustedPeerPropagator::new(NodeAdmin::new(client), log);
    propagator
        .register_self(LocalEndpoint {
            ip,
            port: config.advertise_port,
        })
        .await?;
    propagator.run(shutdown).await
}

async fn run_monitor(
    config: ManagerConfig,
    shutdown: broadcast::Receiver<()>,
) -> Result<(), NetworkError> {
    let client = IpcClient::connect(&config.ipc_path).await;
    QualityMonitor::new(
        NodeAdmin::new(client),
        config.eviction_policy(),
        config.poll_interval(),
    )
    .run(shutdown)
    .await
}
