use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("node RPC error: {0}")]
    Rpc(#[from] peerwarden_rpc::RpcError),

    #[error("announcement log error: {0}")]
    Broker(#[from] peerwarden_broker::BrokerError),

    #[error("malformed peer data: {0}")]
    MalformedPeerData(String),

    #[error("cannot determine local address: {0}")]
    AddressDiscovery(String),
}
