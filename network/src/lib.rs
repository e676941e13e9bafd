//! Peer connectivity management for a ledger node.
//!
//! Two independent loops live here:
//! - [`TrustedPeerPropagator`] announces this node on the shared log and
//!   trusts every node announced there.
//! - [`QualityMonitor`] polls the node's live peers and evicts the ones that
//!   persistently lag the best-known chain, using [`PeerScorer`].

pub mod discovery;
pub mod error;
pub mod monitor;
pub mod scorer;
pub mod trusted;

pub use discovery::{discover_local_ip, LocalEndpoint, DEFAULT_P2P_PORT};
pub use error::NetworkError;
pub use monitor::{PollReport, QualityMonitor, DEFAULT_POLL_INTERVAL};
pub use scorer::{EvictionPolicy, Evaluation, PeerRecord, PeerScorer};
pub use trusted::{RegisteredSet, TrustedPeerPropagator};
