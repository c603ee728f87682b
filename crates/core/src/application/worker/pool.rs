// Worker Pool - fixed set of workers sharing one queue set

use super::{PeerQueueSet, StateCell, Worker, WorkerContext, WorkerState};
use crate::config::PeerQueueConfig;
use crate::error::{AppError, Result};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Starts one worker thread from a prepared builder
pub(crate) type Spawner =
    Box<dyn FnMut(usize, thread::Builder, Worker) -> io::Result<JoinHandle<()>> + Send>;

fn spawn_os_thread(
    _id: usize,
    builder: thread::Builder,
    worker: Worker,
) -> io::Result<JoinHandle<()>> {
    builder.spawn(move || worker.run())
}

struct WorkerSlot {
    id: usize,
    state: Arc<StateCell>,
    handle: Option<JoinHandle<()>>,
}

/// Owns the worker threads of one queue set.
///
/// The pool never closes queues itself: the owner closes them first, which
/// lets every worker drain and observe the end of work.
pub struct WorkerPool {
    config: PeerQueueConfig,
    qset: Arc<PeerQueueSet>,
    slots: Vec<WorkerSlot>,
    spawner: Spawner,
}

impl WorkerPool {
    /// Create a pool of `config.workers` idle slots.
    ///
    /// # Errors
    /// - `AppError::Config` if the configuration is invalid
    pub fn new(config: PeerQueueConfig, qset: Arc<PeerQueueSet>) -> Result<Self> {
        config.validate()?;
        let slots = (0..config.workers)
            .map(|id| WorkerSlot {
                id,
                state: Arc::new(StateCell::new()),
                handle: None,
            })
            .collect();
        Ok(Self {
            config,
            qset,
            slots,
            spawner: Box::new(spawn_os_thread),
        })
    }

    /// Spawn a thread for every slot without one.
    ///
    /// Returns the number of workers running afterwards. A failed spawn only
    /// degrades capacity; it is an error only when no worker runs at all.
    ///
    /// # Errors
    /// - `AppError::ThreadSpawn` if no worker could be started
    pub fn start(&mut self, ctx: WorkerContext) -> Result<usize> {
        let total = self.slots.len();
        let mut last_err: Option<io::Error> = None;

        for slot in self.slots.iter_mut().filter(|s| s.handle.is_none()) {
            let worker = Worker::new(
                slot.id,
                Arc::clone(&self.qset),
                ctx.clone(),
                Arc::clone(&slot.state),
            );
            slot.state.store(WorkerState::Running);

            let builder =
                thread::Builder::new().name(format!("{}-{}", self.config.thread_name, slot.id));
            let spawned = (self.spawner)(slot.id, builder, worker);

            match spawned {
                Ok(handle) => {
                    slot.handle = Some(handle);
                    debug!(worker_id = slot.id, total, "mpeer worker is launched");
                }
                Err(e) => {
                    slot.state.store(WorkerState::Idle);
                    error!(
                        worker_id = slot.id,
                        error = %e,
                        "Failed to create thread to process mpeer queue"
                    );
                    last_err = Some(e);
                }
            }
        }

        let running = self.running();
        if running == 0 {
            let err = last_err.unwrap_or_else(|| io::Error::other("no worker started"));
            return Err(AppError::ThreadSpawn(err));
        }
        if running < total {
            warn!(running, total, "mpeer pool running with degraded capacity");
        }
        Ok(running)
    }

    /// Wake and join every worker.
    ///
    /// Workers finish the item in hand and drain what is still queued
    /// before exiting; idle workers are released by an explicit resume.
    pub fn shutdown(&mut self) {
        let running: Vec<usize> = self
            .slots
            .iter()
            .filter(|s| s.handle.is_some())
            .map(|s| s.id)
            .collect();
        if running.is_empty() {
            return;
        }

        for slot in self.slots.iter().filter(|s| s.handle.is_some()) {
            slot.state.begin_stopping();
            self.qset.resume_threads();
        }

        for slot in self.slots.iter_mut() {
            if let Some(handle) = slot.handle.take() {
                if handle.join().is_err() {
                    error!(worker_id = slot.id, "mpeer worker thread panicked");
                }
                slot.state.store(WorkerState::Stopped);
            }
        }

        // Exit requests nobody consumed must not stop the next generation
        self.qset.discard_resumes();
        info!(workers = running.len(), "mpeer workers joined");
    }

    /// Configured pool size
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Workers with a live thread handle
    pub fn running(&self) -> usize {
        self.slots.iter().filter(|s| s.handle.is_some()).count()
    }

    pub fn states(&self) -> Vec<WorkerState> {
        self.slots.iter().map(|s| s.state.load()).collect()
    }

    /// Replace how worker threads are started
    #[cfg(test)]
    pub(crate) fn set_spawner(&mut self, spawner: Spawner) {
        self.spawner = spawner;
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
