//! JSON-RPC client for a local node's administrative endpoint.
//!
//! Requests travel as bare JSON objects over a Unix stream socket. Replies
//! carry no length prefix, so the client accumulates bytes until one whole
//! JSON value parses (see [`frame`]). One request is outstanding per
//! connection at any time.

pub mod admin;
pub mod client;
pub mod envelope;
pub mod error;
pub mod frame;

pub use admin::{NodeAdmin, Transport};
pub use client::IpcClient;
pub use envelope::{RpcErrorObject, RpcRequest, RpcResponse};
pub use error::RpcError;
pub use frame::{Frame, FrameBuffer, MAX_FRAME_SIZE};
