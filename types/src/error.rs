//! Error type for decoding node-reported data.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypesError {
    #[error("malformed peer data: {0}")]
    MalformedPeer(String),

    #[error("malformed node info: {0}")]
    MalformedNodeInfo(String),
}
