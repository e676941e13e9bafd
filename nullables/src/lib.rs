//! Nullable infrastructure for deterministic testing.
//!
//! The peer-management loops talk to two external systems: the node's RPC
//! endpoint and the announcement log. This crate provides in-memory
//! stand-ins for both that:
//! - Return scripted values
//! - Record every interaction for assertions
//! - Never touch a socket or a broker
//!
//! Handles are cheap to clone and share their state, so a test can keep one
//! handle for assertions while a loop owns another.

pub mod log;
pub mod transport;

pub use log::NullLog;
pub use transport::NullTransport;
