//! Manager configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use peerwarden_broker::{BrokerConfig, TopicSettings};
use peerwarden_network::EvictionPolicy;

use crate::{LogFormat, NodeError};

/// Configuration for a peerwarden process.
///
/// Can be loaded from a TOML file via [`ManagerConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Path of the node's IPC socket.
    #[serde(default)]
    pub ipc_path: PathBuf,

    /// Announcement log topic.
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Broker connection string: `[user[:password]@]host[,host...][?tls=1]`.
    #[serde(default = "default_broker_url")]
    pub broker_url: String,

    /// Partition count used if the topic has to be created.
    #[serde(default = "default_topic_partitions")]
    pub topic_partitions: i32,

    /// Replication factor used if the topic has to be created.
    #[serde(default = "default_topic_replication_factor")]
    pub topic_replication_factor: i16,

    /// Address announced to the organisation. Resolved from the hostname
    /// when unset.
    #[serde(default)]
    pub advertise_ip: Option<IpAddr>,

    /// P2P port announced to the organisation. Taken from the node when unset.
    #[serde(default)]
    pub advertise_port: Option<u16>,

    /// Seconds between peer quality polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Fraction of the best peer's difficulty below which a peer lags.
    #[serde(default = "default_lag_tolerance")]
    pub lag_tolerance: f64,

    /// Strikes a lagging peer may accrue before it is dropped.
    #[serde(default = "default_max_strikes")]
    pub max_strikes: u32,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_topic() -> String {
    "trusted-peers".to_string()
}

fn default_broker_url() -> String {
    "localhost:9092".to_string()
}

fn default_topic_partitions() -> i32 {
    1
}

fn default_topic_replication_factor() -> i16 {
    3
}

fn default_poll_interval_secs() -> u64 {
    peerwarden_network::DEFAULT_POLL_INTERVAL.as_secs()
}

fn default_lag_tolerance() -> f64 {
    EvictionPolicy::DEFAULT_LAG_TOLERANCE
}

fn default_max_strikes() -> u32 {
    EvictionPolicy::DEFAULT_MAX_STRIKES
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ManagerConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Reject settings no task could run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.ipc_path.as_os_str().is_empty() {
            return Err(NodeError::Config("ipc_path is required".into()));
        }
        if self.topic.trim().is_empty() {
            return Err(NodeError::Config("topic is required".into()));
        }
        if !(self.lag_tolerance > 0.0 && self.lag_tolerance <= 1.0) {
            return Err(NodeError::Config(format!(
                "lag_tolerance must be in (0, 1], got {}",
                self.lag_tolerance
            )));
        }
        if self.poll_interval_secs == 0 {
            return Err(NodeError::Config("poll_interval_secs must be positive".into()));
        }
        self.broker()?;
        Ok(())
    }

    pub fn broker(&self) -> Result<BrokerConfig, NodeError> {
        Ok(BrokerConfig::parse(&self.broker_url)?)
    }

    pub fn topic_settings(&self) -> TopicSettings {
        TopicSettings {
            name: self.topic.clone(),
            partitions: self.topic_partitions,
            replication_factor: self.topic_replication_factor,
        }
    }

    pub fn eviction_policy(&self) -> EvictionPolicy {
        EvictionPolicy {
            lag_tolerance: self.lag_tolerance,
            max_strikes: self.max_strikes,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Parsed log format; unknown values fall back to human output.
    pub fn log_format(&self) -> LogFormat {
        self.log_format.parse().unwrap_or(LogFormat::Human)
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            ipc_path: PathBuf::new(),
            topic: default_topic(),
            broker_url: default_broker_url(),
            topic_partitions: default_topic_partitions(),
            topic_replication_factor: default_topic_replication_factor(),
            advertise_ip: None,
            advertise_port: None,
            poll_interval_secs: default_poll_interval_secs(),
            lag_tolerance: default_lag_tolerance(),
            max_strikes: default_max_strikes(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}
