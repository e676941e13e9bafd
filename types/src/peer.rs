//! Per-peer samples decoded from the node's `admin_peers` reply.

use serde_json::Value;

use crate::{NodeAddress, TypesError};

/// Cumulative chain difficulty as reported by a peer.
///
/// Total difficulty on long-lived chains overflows `u64`, so the full
/// 128-bit range is kept.
pub type Difficulty = u128;

/// One live peer as seen in a single `admin_peers` snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerSample {
    pub address: NodeAddress,
    /// Reported difficulty, or 0 when the peer exposes none (or garbage).
    pub difficulty: Difficulty,
}

impl PeerSample {
    /// Decode one entry of the peer list.
    ///
    /// The entry must be an object carrying a string `enode`. A `protocols`
    /// field, when present, must be an object; everything below it is
    /// optional and falls back to difficulty 0.
    pub fn from_value(value: &Value) -> Result<Self, TypesError> {
        let entry = value
            .as_object()
            .ok_or_else(|| TypesError::MalformedPeer(format!("expected object, got {value}")))?;

        let address = entry
            .get("enode")
            .and_then(Value::as_str)
            .map(NodeAddress::new)
            .ok_or_else(|| TypesError::MalformedPeer(format!("missing enode in {value}")))?;

        let difficulty = match entry.get("protocols") {
            None | Some(Value::Null) => 0,
            Some(Value::Object(protocols)) => protocols
                .get("eth")
                .and_then(Value::as_object)
                .and_then(|eth| eth.get("difficulty"))
                .and_then(parse_difficulty)
                .unwrap_or(0),
            Some(other) => {
                return Err(TypesError::MalformedPeer(format!(
                    "protocols of {address} is not an object: {other}"
                )))
            }
        };

        Ok(Self {
            address,
            difficulty,
        })
    }

    /// Decode a full `admin_peers` result. Anything but an array is malformed.
    pub fn parse_list(value: &Value) -> Result<Vec<Self>, TypesError> {
        value
            .as_array()
            .ok_or_else(|| TypesError::MalformedPeer(format!("expected peer list, got {value}")))?
            .iter()
            .map(Self::from_value)
            .collect()
    }
}

/// Decode a difficulty value: a JSON integer, a non-negative float, or a
/// decimal / `0x`-hex string.
pub fn parse_difficulty(value: &Value) -> Option<Difficulty> {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                Some(v as Difficulty)
            } else {
                // Oversized integers arrive as f64 without arbitrary precision.
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f as Difficulty)
            }
        }
        Value::String(s) => {
            let s = s.trim();
            match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(hex) => Difficulty::from_str_radix(hex, 16).ok(),
                None => s.parse().ok(),
            }
        }
        _ => None,
    }
}

/// Highest difficulty in a snapshot; 0 for an empty snapshot.
pub fn max_difficulty(peers: &[PeerSample]) -> Difficulty {
    peers.iter().map(|p| p.difficulty).max().unwrap_or(0)
}
