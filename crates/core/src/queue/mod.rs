// Queue primitives - FIFO queue and multiplexing queue set
//
// Lock order: queue set members -> queue -> signal. Enqueue and close
// release the queue lock before touching the signal.

mod fifo;
mod qset;
mod signal;

pub use fifo::{EnqueueError, Queue};
pub use qset::{Delivery, QueueSet};

use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Queue primitive errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue is closed")]
    Closed,

    #[error("out of memory while growing queue storage")]
    OutOfMemory,

    #[error("queue already belongs to a queue set")]
    AlreadyMember,
}

/// Lock ignoring poison: no user code runs while these locks are held.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
