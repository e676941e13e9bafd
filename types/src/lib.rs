//! Fundamental types for peerwarden.
//!
//! This crate defines the types shared across every other crate in the
//! workspace: node addresses, the node's self-description, and per-peer
//! samples taken from the node's live peer list.

pub mod address;
pub mod error;
pub mod node_info;
pub mod peer;

pub use address::NodeAddress;
pub use error::TypesError;
pub use node_info::NodeInfo;
pub use peer::{max_difficulty, Difficulty, PeerSample};
