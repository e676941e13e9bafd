//! Nullable announcement log — an in-memory topic.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use peerwarden_broker::{log::decode_record, Announcement, AnnouncementLog, BrokerError};
use peerwarden_types::NodeAddress;

#[derive(Default)]
struct Topic {
    records: Vec<Vec<u8>>,
    closed: bool,
}

#[derive(Default)]
struct Shared {
    topic: Mutex<Topic>,
    appended: Notify,
}

/// An in-memory, append-only topic.
///
/// Clones share the topic but each keeps its own read position, the way
/// independent consumers of a real topic do. Reading past the end waits for
/// the next append, or fails with [`BrokerError::StreamClosed`] once the
/// topic has been [`close`](Self::close)d.
#[derive(Clone, Default)]
pub struct NullLog {
    shared: Arc<Shared>,
    cursor: usize,
}

impl NullLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an address as if another node had announced it.
    pub fn push(&self, address: NodeAddress) {
        self.push_raw(address.as_bytes().to_vec());
    }

    /// Append an arbitrary record value.
    pub fn push_raw(&self, value: Vec<u8>) {
        self.shared.topic.lock().unwrap().records.push(value);
        self.shared.appended.notify_waiters();
    }

    /// Make readers that reach the end fail instead of waiting.
    pub fn close(&self) {
        self.shared.topic.lock().unwrap().closed = true;
        self.shared.appended.notify_waiters();
    }

    /// Every decodable address on the topic, in log order.
    pub fn records(&self) -> Vec<NodeAddress> {
        self.shared
            .topic
            .lock()
            .unwrap()
            .records
            .iter()
            .filter_map(|r| decode_record(Some(r.as_slice())))
            .collect()
    }
}

#[async_trait]
impl AnnouncementLog for NullLog {
    async fn announce(&mut self, address: &NodeAddress) -> Result<(), BrokerError> {
        self.push(address.clone());
        Ok(())
    }

    async fn next_announcement(&mut self) -> Result<Announcement, BrokerError> {
        loop {
            let appended = self.shared.appended.notified();
            {
                let topic = self.shared.topic.lock().unwrap();
                while self.cursor < topic.records.len() {
                    let offset = self.cursor;
                    self.cursor += 1;
                    if let Some(address) = decode_record(Some(topic.records[offset].as_slice())) {
                        return Ok(Announcement {
                            offset: offset as i64,
                            address,
                        });
                    }
                }
                if topic.closed {
                    return Err(BrokerError::StreamClosed);
                }
            }
            appended.await;
        }
    }
}
