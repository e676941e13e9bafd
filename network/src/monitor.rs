//! Peer quality polling loop.

use std::time::Duration;

use tokio::sync::broadcast;

use peerwarden_rpc::{NodeAdmin, Transport};
use peerwarden_types::{Difficulty, NodeAddress, PeerSample};

use crate::{EvictionPolicy, NetworkError, PeerScorer};

/// Time between polls of the node's peer list.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(20);

/// What one poll observed and did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PollReport {
    pub block_number: u64,
    pub peer_count: usize,
    pub max_difficulty: Difficulty,
    pub evicted: Vec<NodeAddress>,
    pub failed: Vec<NodeAddress>,
}

/// Polls the node and disconnects peers that keep lagging.
pub struct QualityMonitor<T> {
    admin: NodeAdmin<T>,
    scorer: PeerScorer,
    interval: Duration,
}

impl<T: Transport> QualityMonitor<T> {
    pub fn new(admin: NodeAdmin<T>, policy: EvictionPolicy, interval: Duration) -> Self {
        Self {
            admin,
            scorer: PeerScorer::new(policy),
            interval,
        }
    }

    pub fn scorer(&self) -> &PeerScorer {
        &self.scorer
    }

    /// Take one snapshot, score it, and remove peers over the strike limit.
    ///
    /// A peer the node refuses to remove keeps its record and is retried on
    /// the next poll.
    pub async fn poll_once(&mut self) -> Result<PollReport, NetworkError> {
        let block_number = self.admin.block_number().await?;
        tracing::info!(block_number, "chain head");

        let raw = self.admin.peers().await?;
        let peers = PeerSample::parse_list(&raw)
            .map_err(|e| NetworkError::MalformedPeerData(e.to_string()))?;
        tracing::info!(peer_count = peers.len(), "live peers");

        let evaluation = self.scorer.evaluate(&peers);
        let mut report = PollReport {
            block_number,
            peer_count: peers.len(),
            max_difficulty: evaluation.max_difficulty,
            ..Default::default()
        };

        for peer in evaluation.evict {
            if self.admin.remove_peer(&peer).await? {
                self.scorer.forget(&peer);
                tracing::info!(%peer, "dropped peer for lack of progress");
                report.evicted.push(peer);
            } else {
                tracing::warn!(%peer, "failed to remove peer");
                report.failed.push(peer);
            }
        }

        tracing::debug!(
            max_difficulty = %report.max_difficulty,
            tracked = self.scorer.len(),
            evicted = report.evicted.len(),
            "poll complete"
        );
        Ok(report)
    }

    /// Poll until `shutdown` fires or a poll fails.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<(), NetworkError> {
        tracing::info!(interval_secs = self.interval.as_secs(), "peer quality monitor started");
        loop {
            self.poll_once().await?;
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("peer quality monitor stopping");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
