// Worker - pull, process, respond, release

pub mod constants;
mod panic_guard;
mod pool;

pub use panic_guard::{execute_guarded, PanicGuardResult};
pub use pool::WorkerPool;

use crate::application::response;
use crate::domain::{PeerMsg, StatusCode};
use crate::port::{PeerHandler, ResponseTransport};
use crate::queue::{Delivery, QueueSet};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Queue set drained by peer workers; the context labels the source queue
pub type PeerQueueSet = QueueSet<PeerMsg, &'static str>;

/// Worker lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Not started
    Idle,
    /// Blocked in the queue set or processing an item
    Running,
    /// Shutdown requested, draining
    Stopping,
    /// Thread exited
    Stopped,
}

impl WorkerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => WorkerState::Idle,
            1 => WorkerState::Running,
            2 => WorkerState::Stopping,
            _ => WorkerState::Stopped,
        }
    }
}

/// Worker state shared between the pool and the worker thread
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(WorkerState::Idle as u8))
    }

    pub(crate) fn load(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Running -> Stopping; any other state is left alone
    pub(crate) fn begin_stopping(&self) {
        let _ = self.0.compare_exchange(
            WorkerState::Running as u8,
            WorkerState::Stopping as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

/// Collaborators every worker calls per item
#[derive(Clone)]
pub struct WorkerContext {
    pub handler: Arc<dyn PeerHandler>,
    pub transport: Arc<dyn ResponseTransport>,
}

/// One worker thread's loop over a shared queue set
pub struct Worker {
    id: usize,
    qset: Arc<PeerQueueSet>,
    ctx: WorkerContext,
    state: Arc<StateCell>,
}

impl Worker {
    pub(crate) fn new(
        id: usize,
        qset: Arc<PeerQueueSet>,
        ctx: WorkerContext,
        state: Arc<StateCell>,
    ) -> Self {
        Self {
            id,
            qset,
            ctx,
            state,
        }
    }

    /// Serve items until the queue set reports no further work will arrive
    pub fn run(&self) {
        info!(worker_id = self.id, "mpeer worker started");

        while let Some(delivery) = self.qset.wait_any_blocking() {
            self.serve(delivery);
        }

        debug!(worker_id = self.id, "Got no message from qset, exiting");
        self.state.store(WorkerState::Stopped);
    }

    fn serve(&self, delivery: Delivery<PeerMsg, &'static str>) {
        let Delivery {
            kind,
            mut item,
            context,
        } = delivery;

        trace!(
            worker_id = self.id,
            queue = context,
            kind = ?kind,
            ahandle = item.ahandle,
            msg = %item.msg_type,
            waited_us = item.age().as_micros() as u64,
            "Msg will be processed in mpeer queue"
        );

        let handler = self.ctx.handler.as_ref();
        let code = match execute_guarded(AssertUnwindSafe(|| handler.process(&mut item))) {
            PanicGuardResult::Success(code) => code,
            PanicGuardResult::Panicked(msg) => {
                warn!(
                    worker_id = self.id,
                    ahandle = item.ahandle,
                    panic_msg = %msg,
                    "Handler panicked, answering with unexpected error"
                );
                StatusCode::UNEXPECTED
            }
        };

        response::send_peer_rsp(self.ctx.transport.as_ref(), &mut item, code);
        handler.release(item);
    }
}
