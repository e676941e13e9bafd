//! Peerwarden runtime: configuration, logging, shutdown, and the supervisor
//! that runs trusted-peer propagation and peer-quality monitoring side by
//! side.

pub mod config;
pub mod error;
pub mod logging;
pub mod shutdown;
pub mod supervisor;

pub use config::ManagerConfig;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use shutdown::ShutdownController;
pub use supervisor::{supervise, Supervisor, Unit};
