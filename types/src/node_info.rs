//! The node's own description from `admin_nodeInfo`.

use serde::Deserialize;

use crate::{NodeAddress, TypesError};

/// Subset of `admin_nodeInfo` used to build the local announcement.
#[derive(Clone, Debug, Deserialize)]
pub struct NodeInfo {
    pub enode: NodeAddress,
    #[serde(default)]
    pub ports: Option<NodePorts>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NodePorts {
    #[serde(default)]
    pub listener: Option<u16>,
}

impl NodeInfo {
    pub fn from_value(value: serde_json::Value) -> Result<Self, TypesError> {
        serde_json::from_value(value).map_err(|e| TypesError::MalformedNodeInfo(e.to_string()))
    }

    /// The P2P listening port the node reports, if any.
    pub fn listener_port(&self) -> Option<u16> {
        self.ports.as_ref().and_then(|p| p.listener)
    }
}
