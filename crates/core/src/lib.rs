// Peerq Core - mnode peer message queue
// Queue primitives, worker pool and dispatch gateway; collaborators plug in via `port`

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod port;
pub mod queue;

pub use application::{MnodePeer, PeerPorts};
pub use config::PeerQueueConfig;
pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
