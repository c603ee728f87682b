// Application Layer - gateway, workers and the service that owns them

pub mod dispatch;
pub mod peer_service;
pub mod response;
pub mod worker;

// Re-exports
pub use dispatch::{DispatchGateway, PeerPorts, QueueSlot};
pub use peer_service::{MnodePeer, PeerStats, SERVICE_QUEUE};
pub use worker::{PeerQueueSet, Worker, WorkerContext, WorkerPool, WorkerState};
