//! Broker error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("invalid broker url: {0}")]
    InvalidUrl(String),

    #[error("kafka error: {0}")]
    Kafka(#[from] rskafka::client::error::Error),

    #[error("announcement stream closed")]
    StreamClosed,
}
