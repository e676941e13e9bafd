//! Node address (enode) type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// An opaque peer connection descriptor of the form `{identity}@{host}:{port}`.
///
/// The string is never normalised: two addresses are the same peer only when
/// the strings are byte-for-byte equal, which is how the node itself keys its
/// peer table.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeAddress(String);

impl NodeAddress {
    /// Wrap a raw address string as reported by a node or an announcement.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Build an address from an identity prefix and a routable endpoint.
    pub fn from_parts(identity: &str, host: IpAddr, port: u16) -> Self {
        Self(format!("{identity}@{host}:{port}"))
    }

    /// The identity prefix: everything before the first `@`.
    ///
    /// An address without `@` is all identity.
    pub fn identity(&self) -> &str {
        self.0.split('@').next().unwrap_or(&self.0)
    }

    /// Rebuild this address with the same identity at a different endpoint.
    pub fn with_endpoint(&self, host: IpAddr, port: u16) -> Self {
        Self::from_parts(self.identity(), host, port)
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw UTF-8 bytes, as written to the announcement log.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NodeAddress {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for NodeAddress {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
