//! Announcement log: an append-only, offset-ordered topic shared by every
//! node of an organisation.
//!
//! [`AnnouncementLog`] is the seam the trusted-peer propagator works
//! against; [`KafkaLog`] is the production implementation.

pub mod config;
pub mod error;
pub mod kafka;
pub mod log;

pub use config::{BrokerConfig, SaslCredentials};
pub use error::BrokerError;
pub use kafka::{KafkaLog, TopicSettings};
pub use log::{Announcement, AnnouncementLog};
