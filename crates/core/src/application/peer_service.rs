// Mnode Peer Service - owner of the peer queue set, queue and worker pool

use crate::application::dispatch::{DispatchGateway, PeerPorts, QueueSlot};
use crate::application::worker::{PeerQueueSet, WorkerContext, WorkerPool, WorkerState};
use crate::config::PeerQueueConfig;
use crate::domain::RpcMsg;
use crate::error::{AppError, Result};
use crate::queue::Queue;
use std::sync::Arc;
use tracing::{debug, info};

/// Label attached to items pulled from the service queue
pub const SERVICE_QUEUE: &str = "mpeer";

/// Snapshot of the service for status output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerStats {
    pub allocated: bool,
    pub queued: usize,
    pub workers: Vec<WorkerState>,
}

/// Peer message subsystem.
///
/// Lifecycle: `open` → `allocate_queue` → `dispatch`* → `free_queue` →
/// (`allocate_queue` again) → `cleanup`.
pub struct MnodePeer {
    qset: Arc<PeerQueueSet>,
    slot: Arc<QueueSlot>,
    pool: WorkerPool,
    gateway: DispatchGateway,
    ctx: WorkerContext,
    queue_capacity: usize,
}

impl MnodePeer {
    /// Build the queue set and an idle worker pool. No thread runs yet.
    ///
    /// # Errors
    /// - `AppError::Config` if the configuration is invalid
    pub fn open(config: PeerQueueConfig, ports: PeerPorts) -> Result<Self> {
        let qset = Arc::new(PeerQueueSet::new());
        let slot = Arc::new(QueueSlot::default());
        let queue_capacity = config.queue_capacity;
        let pool = WorkerPool::new(config, Arc::clone(&qset))?;
        let ctx = WorkerContext {
            handler: Arc::clone(&ports.handler),
            transport: Arc::clone(&ports.transport),
        };
        let gateway = DispatchGateway::new(ports, Arc::clone(&slot));

        info!(workers = pool.size(), "dnode mpeer is opened");
        Ok(Self {
            qset,
            slot,
            pool,
            gateway,
            ctx,
            queue_capacity,
        })
    }

    /// Create the service queue, join it to the queue set and start workers.
    ///
    /// # Errors
    /// - `AppError::AlreadyAllocated` if a queue is allocated already
    /// - `AppError::OutOfMemory` if queue storage cannot be reserved
    /// - `AppError::ThreadSpawn` if no worker thread could be started
    pub fn allocate_queue(&mut self) -> Result<()> {
        if self.slot.get().is_some() {
            return Err(AppError::AlreadyAllocated);
        }

        let queue = Arc::new(Queue::with_capacity(self.queue_capacity)?);
        self.qset.add(Arc::clone(&queue), SERVICE_QUEUE)?;

        if let Err(e) = self.pool.start(self.ctx.clone()) {
            queue.close();
            self.qset.remove(&queue);
            return Err(e);
        }

        self.slot.replace(Some(queue));
        debug!(workers = self.pool.running(), "dnode mpeer queue is allocated");
        Ok(())
    }

    /// Close the service queue, let workers drain it, and join them.
    ///
    /// Messages dispatched afterwards are redirected. No-op without a queue.
    pub fn free_queue(&mut self) {
        let Some(queue) = self.slot.replace(None) else {
            return;
        };

        queue.close();
        self.pool.shutdown();
        self.qset.remove(&queue);
        debug!("dnode mpeer queue is freed");
    }

    /// Entry point for peer messages; see `DispatchGateway::dispatch`
    pub fn dispatch(&self, msg: RpcMsg) -> Result<()> {
        self.gateway.dispatch(msg)
    }

    pub fn stats(&self) -> PeerStats {
        PeerStats {
            allocated: self.slot.get().is_some(),
            queued: self.qset.item_count(),
            workers: self.pool.states(),
        }
    }

    /// Free the queue and stop every worker
    pub fn cleanup(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.free_queue();
        self.pool.shutdown();
        info!("dnode mpeer is closed");
    }
}

impl Drop for MnodePeer {
    fn drop(&mut self) {
        if self.slot.get().is_some() || self.pool.running() > 0 {
            self.shutdown();
        }
    }
}
