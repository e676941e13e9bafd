//! Discovery of the endpoint this node advertises to its organisation.

use std::net::IpAddr;

use crate::NetworkError;

/// P2P port assumed when neither configuration nor the node reports one.
pub const DEFAULT_P2P_PORT: u16 = 30303;

/// Host and optional port override for the local announcement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalEndpoint {
    pub ip: IpAddr,
    /// Explicit port; when `None` the node's reported listener port is used.
    pub port: Option<u16>,
}

impl LocalEndpoint {
    /// Resolve the port to advertise.
    pub fn port_or(&self, reported: Option<u16>) -> u16 {
        self.port.or(reported).unwrap_or(DEFAULT_P2P_PORT)
    }
}

/// Resolve this host's routable address from its hostname.
///
/// IPv4 addresses are preferred, matching what the node advertises on
/// organisation-internal networks.
pub async fn discover_local_ip() -> Result<IpAddr, NetworkError> {
    let hostname = gethostname::gethostname()
        .into_string()
        .map_err(|raw| NetworkError::AddressDiscovery(format!("hostname is not UTF-8: {raw:?}")))?;

    let addrs: Vec<IpAddr> = tokio::net::lookup_host((hostname.as_str(), 0))
        .await
        .map_err(|e| NetworkError::AddressDiscovery(format!("resolving {hostname}: {e}")))?
        .map(|sa| sa.ip())
        .collect();

    let ip = addrs
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| NetworkError::AddressDiscovery(format!("{hostname} has no addresses")))?;

    tracing::debug!(%hostname, %ip, "discovered local address");
    Ok(ip)
}
