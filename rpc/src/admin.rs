//! Typed wrappers for the node's `admin_*` and `eth_*` methods.

use async_trait::async_trait;
use serde_json::{json, Value};

use peerwarden_types::{NodeAddress, NodeInfo};

use crate::envelope::{is_truthy, RpcResponse};
use crate::RpcError;

/// Anything that can carry one JSON-RPC request to the node and return the
/// correlated reply.
#[async_trait]
pub trait Transport: Send {
    async fn call(&mut self, method: &str, params: Value) -> Result<RpcResponse, RpcError>;
}

/// Administrative view of a node, layered over a [`Transport`].
pub struct NodeAdmin<T> {
    transport: T,
}

impl<T: Transport> NodeAdmin<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// `admin_nodeInfo`.
    pub async fn node_info(&mut self) -> Result<NodeInfo, RpcError> {
        let result = self
            .transport
            .call("admin_nodeInfo", json!([]))
            .await?
            .into_result()?;
        NodeInfo::from_value(result).map_err(|e| RpcError::MalformedResponse(e.to_string()))
    }

    /// `admin_addTrustedPeer`. The raw reply is returned so callers can
    /// decide whether a remote error matters.
    pub async fn add_trusted_peer(&mut self, peer: &NodeAddress) -> Result<RpcResponse, RpcError> {
        self.transport
            .call("admin_addTrustedPeer", json!([peer]))
            .await
    }

    /// `admin_addPeer`.
    pub async fn add_peer(&mut self, peer: &NodeAddress) -> Result<RpcResponse, RpcError> {
        self.transport.call("admin_addPeer", json!([peer])).await
    }

    /// `admin_removePeer`. Returns whether the node reported success; an
    /// error reply counts as failure.
    pub async fn remove_peer(&mut self, peer: &NodeAddress) -> Result<bool, RpcError> {
        let response = self
            .transport
            .call("admin_removePeer", json!([peer]))
            .await?;
        if let Some(err) = &response.error {
            tracing::debug!(peer = %peer, code = err.code, message = %err.message, "admin_removePeer rejected");
        }
        Ok(response.result.as_ref().is_some_and(is_truthy))
    }

    /// `admin_peers`, undecoded.
    pub async fn peers(&mut self) -> Result<Value, RpcError> {
        self.transport
            .call("admin_peers", json!([]))
            .await?
            .into_result()
    }

    /// `eth_blockNumber`, decoded from its hex quantity.
    pub async fn block_number(&mut self) -> Result<u64, RpcError> {
        let result = self
            .transport
            .call("eth_blockNumber", json!([]))
            .await?
            .into_result()?;
        parse_quantity(&result)
    }
}

/// Decode a `0x`-prefixed hex quantity.
pub fn parse_quantity(value: &Value) -> Result<u64, RpcError> {
    let s = value
        .as_str()
        .ok_or_else(|| RpcError::MalformedResponse(format!("expected hex quantity, got {value}")))?;
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16)
        .map_err(|e| RpcError::MalformedResponse(format!("bad hex quantity {s:?}: {e}")))
}
