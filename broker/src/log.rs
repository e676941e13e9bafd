//! The announcement log abstraction.

use async_trait::async_trait;

use peerwarden_types::NodeAddress;

use crate::BrokerError;

/// One record read back from the log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Announcement {
    pub offset: i64,
    pub address: NodeAddress,
}

/// An append-only log of node addresses, read from the earliest retained
/// record.
///
/// Reading is a lazy, infinite, non-restartable sequence: each call to
/// [`next_announcement`](Self::next_announcement) waits for the record after
/// the previous one. Callers that need to stop between records race this
/// call against their own cancellation signal.
#[async_trait]
pub trait AnnouncementLog: Send {
    /// Append this node's address.
    async fn announce(&mut self, address: &NodeAddress) -> Result<(), BrokerError>;

    /// Wait for the next announcement in log order.
    async fn next_announcement(&mut self) -> Result<Announcement, BrokerError>;
}

/// Decode a raw record value into an address.
///
/// Returns `None` for empty and non-UTF-8 values; they cannot name a peer.
pub fn decode_record(value: Option<&[u8]>) -> Option<NodeAddress> {
    let bytes = value?;
    let text = std::str::from_utf8(bytes).ok()?.trim();
    if text.is_empty() {
        return None;
    }
    Some(NodeAddress::new(text))
}
