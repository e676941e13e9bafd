//! Peerwarden daemon: keeps a node's trusted peers in sync with its
//! organisation and drops peers that stop making progress.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use peerwarden_node::{init_logging, ManagerConfig, Supervisor};

#[derive(Parser)]
#[command(name = "peerwarden", about = "Trusted peer propagation and peer quality monitoring")]
struct Cli {
    /// Path of the node's IPC socket.
    #[arg(env = "PEERWARDEN_IPC_PATH")]
    ipc_path: Option<PathBuf>,

    /// Announcement log topic shared by the organisation.
    #[arg(env = "PEERWARDEN_TOPIC")]
    topic: Option<String>,

    /// Broker connection string: `[user[:password]@]host[,host...][?tls=1]`.
    #[arg(env = "PEERWARDEN_BROKER_URL")]
    broker_url: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; arguments and env vars override them.
    #[arg(long, env = "PEERWARDEN_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to announce instead of the one resolved from the hostname.
    #[arg(long, env = "PEERWARDEN_ADVERTISE_IP")]
    advertise_ip: Option<IpAddr>,

    /// P2P port to announce instead of the node's listener port.
    #[arg(long, env = "PEERWARDEN_ADVERTISE_PORT")]
    advertise_port: Option<u16>,

    /// Seconds between peer quality polls.
    #[arg(long, env = "PEERWARDEN_POLL_INTERVAL_SECS")]
    poll_interval_secs: Option<u64>,

    /// Fraction of the best peer's difficulty below which a peer is lagging.
    #[arg(long, env = "PEERWARDEN_LAG_TOLERANCE")]
    lag_tolerance: Option<f64>,

    /// Strikes a lagging peer may accrue before it is removed.
    #[arg(long, env = "PEERWARDEN_MAX_STRIKES")]
    max_strikes: Option<u32>,

    /// Log format: "human" or "json".
    #[arg(long, env = "PEERWARDEN_LOG_FORMAT")]
    log_format: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "PEERWARDEN_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Layer arguments over `base`.
    fn apply(self, base: ManagerConfig) -> ManagerConfig {
        ManagerConfig {
            ipc_path: self.ipc_path.unwrap_or(base.ipc_path),
            topic: self.topic.unwrap_or(base.topic),
            broker_url: self.broker_url.unwrap_or(base.broker_url),
            advertise_ip: self.advertise_ip.or(base.advertise_ip),
            advertise_port: self.advertise_port.or(base.advertise_port),
            poll_interval_secs: self.poll_interval_secs.unwrap_or(base.poll_interval_secs),
            lag_tolerance: self.lag_tolerance.unwrap_or(base.lag_tolerance),
            max_strikes: self.max_strikes.unwrap_or(base.max_strikes),
            log_format: self.log_format.unwrap_or(base.log_format),
            log_level: self.log_level.unwrap_or(base.log_level),
            ..base
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut cli = Cli::parse();

    // Logging is configured from the merged settings, so file problems are
    // collected here and reported once the subscriber exists.
    let mut file_warning = None;
    let base = match cli.config.take() {
        Some(path) => match ManagerConfig::from_toml_file(&path.to_string_lossy()) {
            Ok(cfg) => cfg,
            Err(e) => {
                file_warning = Some(format!(
                    "failed to load config file {}: {e}, using defaults",
                    path.display()
                ));
                ManagerConfig::default()
            }
        },
        None => ManagerConfig::default(),
    };
    let config = cli.apply(base);

    init_logging(config.log_format(), &config.log_level)?;
    if let Some(warning) = file_warning {
        tracing::warn!("{warning}");
    }

    Supervisor::new(config).run().await?;

    tracing::info!("peerwarden exited cleanly");
    Ok(())
}
