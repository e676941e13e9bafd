//! Strike-based peer scoring with hysteresis.
//!
//! Every poll, peers whose reported difficulty sits below
//! `max_difficulty * lag_tolerance` earn a strike unless they improved since
//! their last record, in which case their strikes are forgiven. A peer is up
//! for eviction once its strikes exceed `max_strikes`.

use std::collections::{HashMap, HashSet};

use peerwarden_types::{max_difficulty, Difficulty, NodeAddress, PeerSample};

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Lag tolerance and strike limit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvictionPolicy {
    /// Fraction of the best difficulty a peer must reach to be left alone.
    pub lag_tolerance: f64,
    /// Strikes a peer may hold; one more makes it an eviction candidate.
    pub max_strikes: u32,
}

impl EvictionPolicy {
    pub const DEFAULT_LAG_TOLERANCE: f64 = 0.9999;
    pub const DEFAULT_MAX_STRIKES: u32 = 10;

    /// Whether `difficulty` is outside the tolerance band below `max`.
    pub fn is_lagging(&self, difficulty: Difficulty, max: Difficulty) -> bool {
        (difficulty as f64) < (max as f64) * self.lag_tolerance
    }
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self {
            lag_tolerance: Self::DEFAULT_LAG_TOLERANCE,
            max_strikes: Self::DEFAULT_MAX_STRIKES,
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// What the scorer remembers about one peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeerRecord {
    pub difficulty: Difficulty,
    pub strikes: u32,
}

impl PeerRecord {
    fn fresh(difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            strikes: 0,
        }
    }
}

/// Result of scoring one snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Evaluation {
    pub max_difficulty: Difficulty,
    /// Peers whose strikes exceed the limit, in snapshot order.
    pub evict: Vec<NodeAddress>,
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

/// Per-peer strike bookkeeping. Owned by a single monitor loop.
#[derive(Debug, Default)]
pub struct PeerScorer {
    policy: EvictionPolicy,
    records: HashMap<NodeAddress, PeerRecord>,
}

impl PeerScorer {
    pub fn new(policy: EvictionPolicy) -> Self {
        Self {
            policy,
            records: HashMap::new(),
        }
    }

    /// Score one consistent snapshot of the live peer list.
    ///
    /// Records of peers missing from the snapshot are dropped. Candidates in
    /// the returned [`Evaluation`] keep their record until [`forget`] is
    /// called, so a failed removal is retried on the next snapshot.
    ///
    /// [`forget`]: Self::forget
    pub fn evaluate(&mut self, peers: &[PeerSample]) -> Evaluation {
        let max = max_difficulty(peers);
        let mut evict = Vec::new();

        for peer in peers {
            let record = self
                .records
                .entry(peer.address.clone())
                .or_insert_with(|| PeerRecord::fresh(peer.difficulty));

            if !self.policy.is_lagging(peer.difficulty, max) {
                continue;
            }

            if record.difficulty < peer.difficulty {
                *record = PeerRecord::fresh(peer.difficulty);
            } else {
                record.strikes += 1;
            }

            if record.strikes > self.policy.max_strikes {
                tracing::debug!(
                    peer = %peer.address,
                    difficulty = %peer.difficulty,
                    max_difficulty = %max,
                    strikes = record.strikes,
                    "peer exceeded strike limit"
                );
                evict.push(peer.address.clone());
            }
        }

        let live: HashSet<&NodeAddress> = peers.iter().map(|p| &p.address).collect();
        self.records.retain(|addr, _| live.contains(addr));

        Evaluation {
            max_difficulty: max,
            evict,
        }
    }

    /// Drop a peer's record after the node confirmed its removal.
    pub fn forget(&mut self, address: &NodeAddress) -> Option<PeerRecord> {
        self.records.remove(address)
    }

    pub fn record(&self, address: &NodeAddress) -> Option<&PeerRecord> {
        self.records.get(address)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
