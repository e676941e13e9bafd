use thiserror::Error;

use peerwarden_network::NetworkError;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("broker error: {0}")]
    Broker(#[from] peerwarden_broker::BrokerError),

    #[error("{0} task exited")]
    TaskExited(&'static str),

    #[error("{task} task failed: {source}")]
    TaskFailed {
        task: &'static str,
        #[source]
        source: NetworkError,
    },

    #[error("{task} task panicked: {message}")]
    TaskPanicked { task: &'static str, message: String },
}
