//! Trusted-peer propagation over the shared announcement log.
//!
//! On start the node's own address is appended to the log. The log is then
//! replayed from its earliest record, forever, and every address not yet
//! seen is added to the node as a trusted peer and dialled. Replaying from
//! the start on every launch makes a fresh process converge to the same
//! trusted set as a long-running one.

use std::collections::HashSet;

use tokio::sync::broadcast;

use peerwarden_broker::{Announcement, AnnouncementLog};
use peerwarden_rpc::{NodeAdmin, RpcResponse, Transport};
use peerwarden_types::NodeAddress;

use crate::{LocalEndpoint, NetworkError};

/// Addresses this process has already acted on. Only grows.
#[derive(Debug, Default)]
pub struct RegisteredSet {
    seen: HashSet<NodeAddress>,
}

impl RegisteredSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an address; returns `false` if it was already present.
    pub fn insert(&mut self, address: NodeAddress) -> bool {
        self.seen.insert(address)
    }

    pub fn contains(&self, address: &NodeAddress) -> bool {
        self.seen.contains(address)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeAddress> {
        self.seen.iter()
    }
}

/// Announces this node and trusts every node announced by others.
pub struct TrustedPeerPropagator<T, L> {
    admin: NodeAdmin<T>,
    log: L,
    registered: RegisteredSet,
}

impl<T, L> TrustedPeerPropagator<T, L>
where
    T: Transport,
    L: AnnouncementLog,
{
    pub fn new(admin: NodeAdmin<T>, log: L) -> Self {
        Self {
            admin,
            log,
            registered: RegisteredSet::new(),
        }
    }

    pub fn registered(&self) -> &RegisteredSet {
        &self.registered
    }

    /// Build this node's address from its reported identity and `endpoint`,
    /// publish it, and mark it registered so it is never added to itself.
    pub async fn register_self(&mut self, endpoint: LocalEndpoint) -> Result<NodeAddress, NetworkError> {
        let info = self.admin.node_info().await?;
        let port = endpoint.port_or(info.listener_port());
        let local = info.enode.with_endpoint(endpoint.ip, port);

        self.log.announce(&local).await?;
        tracing::info!(address = %local, "registered on announcement log");

        self.registered.insert(local.clone());
        Ok(local)
    }

    /// Apply one announcement. Returns whether the address was new.
    ///
    /// The address counts as registered once both calls have been issued,
    /// whatever the node answered; a later duplicate is a no-op.
    pub async fn apply(&mut self, announcement: &Announcement) -> Result<bool, NetworkError> {
        let peer = &announcement.address;
        if self.registered.contains(peer) {
            tracing::trace!(%peer, offset = announcement.offset, "announcement already applied");
            return Ok(false);
        }

        let trusted = self.admin.add_trusted_peer(peer).await?;
        log_rejection("admin_addTrustedPeer", peer, &trusted);
        let dialled = self.admin.add_peer(peer).await?;
        log_rejection("admin_addPeer", peer, &dialled);

        tracing::info!(%peer, offset = announcement.offset, "added trusted peer");
        self.registered.insert(peer.clone());
        Ok(true)
    }

    /// Replay the log until `shutdown` fires or an error occurs.
    ///
    /// Shutdown is only observed between records, never in the middle of
    /// applying one. The registered set stays inspectable afterwards.
    pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) -> Result<(), NetworkError> {
        loop {
            let announcement = tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!(registered = self.registered.len(), "trusted peer propagation stopping");
                    return Ok(());
                }
                next = self.log.next_announcement() => next?,
            };
            self.apply(&announcement).await?;
        }
    }
}

fn log_rejection(method: &str, peer: &NodeAddress, response: &RpcResponse) {
    if let Some(err) = &response.error {
        tracing::warn!(%peer, method, code = err.code, message = %err.message, "node rejected trusted peer call");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    use peerwarden_broker::BrokerError;
    use peerwarden_nullables::{NullLog, NullTransport};
    use serde_json::json;

    fn node() -> NullTransport {
        let node = NullTransport::new();
        node.respond_always(
            "admin_nodeInfo",
            json!({ "enode": "enode://self@127.0.0.1:30303?discport=0", "ports": { "listener": 30303 } }),
        );
        node.respond_always("admin_addTrustedPeer", json!(true));
        node.respond_always("admin_addPeer", json!(true));
        node
    }

    fn endpoint() -> LocalEndpoint {
        LocalEndpoint {
            ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)),
            port: None,
        }
    }

    #[tokio::test]
    async fn self_registration_announces_local_address() {
        let node = node();
        let log = NullLog::new();
        let mut propagator = TrustedPeerPropagator::new(NodeAdmin::new(node.clone()), log.clone());

        let local = propagator.register_self(endpoint()).await.unwrap();

        assert_eq!(local.as_str(), "enode://self@10.0.0.7:30303");
        assert_eq!(log.records(), vec![local.clone()]);
        assert!(propagator.registered().contains(&local));
    }

    #[tokio::test]
    async fn replay_adds_each_distinct_peer_once() {
        let node = node();
        let log = NullLog::new();
        for peer in ["enode://a@10.0.0.1:30303", "enode://b@10.0.0.2:30303", "enode://a@10.0.0.1:30303"] {
            log.push(NodeAddress::new(peer));
        }
        log.close();

        let mut propagator = TrustedPeerPropagator::new(NodeAdmin::new(node.clone()), log.clone());
        let local = propagator.register_self(endpoint()).await.unwrap();

        let (_tx, rx) = broadcast::channel(1);
        let result = propagator.run(rx).await;
        assert!(matches!(
            result,
            Err(NetworkError::Broker(BrokerError::StreamClosed))
        ));

        let trusted = node.calls_to("admin_addTrustedPeer");
        assert_eq!(
            trusted,
            vec![json!(["enode://a@10.0.0.1:30303"]), json!(["enode://b@10.0.0.2:30303"])]
        );
        assert_eq!(node.calls_to("admin_addPeer").len(), 2);
        assert!(!trusted.contains(&json!([local])));
    }

    #[tokio::test]
    async fn trusted_call_precedes_dial() {
        let node = node();
        let log = NullLog::new();
        let mut propagator = TrustedPeerPropagator::new(NodeAdmin::new(node.clone()), log);

        let announcement = Announcement {
            offset: 0,
            address: NodeAddress::new("enode://a@10.0.0.1:30303"),
        };
        assert!(propagator.apply(&announcement).await.unwrap());
        assert!(!propagator.apply(&announcement).await.unwrap());

        let methods: Vec<String> = node.calls().into_iter().map(|(m, _)| m).collect();
        assert_eq!(methods, vec!["admin_addTrustedPeer", "admin_addPeer"]);
    }

    #[tokio::test]
    async fn rejected_calls_still_register() {
        let node = NullTransport::new();
        node.fail("admin_addTrustedPeer", -32000, "invalid enode");
        node.fail("admin_addPeer", -32000, "invalid enode");
        let mut propagator = TrustedPeerPropagator::new(NodeAdmin::new(node.clone()), NullLog::new());

        let announcement = Announcement {
            offset: 3,
            address: NodeAddress::new("garbage"),
        };
        assert!(propagator.apply(&announcement).await.unwrap());
        assert!(propagator.registered().contains(&announcement.address));
        assert!(!propagator.apply(&announcement).await.unwrap());
        assert_eq!(node.calls().len(), 2);
    }

    #[tokio::test]
    async fn transport_failure_stops_propagation() {
        let node = NullTransport::new();
        node.fail_transport("admin_addTrustedPeer");
        let log = NullLog::new();
        log.push(NodeAddress::new("enode://a@10.0.0.1:30303"));
        let mut propagator = TrustedPeerPropagator::new(NodeAdmin::new(node.clone()), log);

        let (_tx, rx) = broadcast::channel(1);
        assert!(matches!(propagator.run(rx).await, Err(NetworkError::Rpc(_))));
        assert!(node.calls_to("admin_addPeer").is_empty());
    }

    #[tokio::test]
    async fn shutdown_interrupts_wait_for_next_record() {
        let node = node();
        let log = NullLog::new();
        log.push(NodeAddress::new("enode://a@10.0.0.1:30303"));
        let mut propagator = TrustedPeerPropagator::new(NodeAdmin::new(node.clone()), log.clone());

        let (tx, rx) = broadcast::channel(1);
        let task = tokio::spawn(async move { propagator.run(rx).await });

        // Let the first record be applied, then the loop parks on the log tail.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(node.calls_to("admin_addTrustedPeer").len(), 1);

        tx.send(()).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("propagator did not observe shutdown")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn late_announcements_are_picked_up() {
        let node = node();
        let log = NullLog::new();
        let mut propagator = TrustedPeerPropagator::new(NodeAdmin::new(node.clone()), log.clone());

        let (tx, rx) = broadcast::channel(1);
        let task = tokio::spawn(async move { propagator.run(rx).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        log.push(NodeAddress::new("enode://late@10.0.0.9:30303"));
        tokio::time::sleep(Duration::from_millis(50)).await;

        tx.send(()).unwrap();
        task.await.unwrap().unwrap();
        assert_eq!(
            node.calls_to("admin_addTrustedPeer"),
            vec![json!(["enode://late@10.0.0.9:30303"])]
        );
    }
}
