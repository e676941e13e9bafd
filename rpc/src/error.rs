//! RPC error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed by node")]
    ConnectionClosed,

    #[error("frame too large: {size} > {max}")]
    FrameTooLarge { size: usize, max: usize },

    #[error("response id {got} does not match request id {expected}")]
    ProtocolMismatch { expected: u64, got: serde_json::Value },

    #[error("node returned error {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RpcError {
    /// Whether this error means the connection itself is unusable.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::ConnectionClosed | Self::FrameTooLarge { .. }
        )
    }
}
