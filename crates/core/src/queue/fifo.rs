// Unbounded FIFO queue with blocking dequeue

use super::signal::Signal;
use super::{lock, QueueError};
use crate::domain::ItemKind;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, PoisonError};

/// Rejected enqueue; hands the item back so the caller can release it.
pub struct EnqueueError<T> {
    pub reason: QueueError,
    pub kind: ItemKind,
    pub item: T,
}

impl<T> EnqueueError<T> {
    pub fn into_item(self) -> T {
        self.item
    }
}

impl<T> fmt::Debug for EnqueueError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnqueueError")
            .field("reason", &self.reason)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for EnqueueError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "enqueue of {:?} item rejected: {}", self.kind, self.reason)
    }
}

/// Result of a non-blocking poll used by the queue set scan
pub(crate) enum Poll<T> {
    Ready(ItemKind, T),
    Empty { closed: bool },
}

struct Inner<T> {
    entries: VecDeque<(ItemKind, T)>,
    closed: bool,
    /// Wake signal of the owning queue set, if any
    signal: Option<Arc<Signal>>,
}

/// Thread-safe FIFO of work items.
///
/// Once closed, enqueue is rejected but items already queued stay
/// drainable; `dequeue_blocking` returns `None` only when closed and empty.
pub struct Queue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
}

impl<T> Queue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: VecDeque::new(),
                closed: false,
                signal: None,
            }),
            not_empty: Condvar::new(),
        }
    }

    /// Create a queue with storage for `capacity` items reserved up front.
    ///
    /// # Errors
    /// - `QueueError::OutOfMemory` if the reservation fails
    pub fn with_capacity(capacity: usize) -> Result<Self, QueueError> {
        let mut entries = VecDeque::new();
        entries
            .try_reserve(capacity)
            .map_err(|_| QueueError::OutOfMemory)?;
        Ok(Self {
            inner: Mutex::new(Inner {
                entries,
                closed: false,
                signal: None,
            }),
            not_empty: Condvar::new(),
        })
    }

    /// Append `item` at the tail and wake one waiter.
    ///
    /// # Errors
    /// - `QueueError::Closed` once `close` has been called
    /// - `QueueError::OutOfMemory` if the storage cannot grow
    ///
    /// The item is returned inside the error in both cases.
    pub fn enqueue(&self, item: T, kind: ItemKind) -> Result<(), EnqueueError<T>> {
        let signal = {
            let mut inner = lock(&self.inner);
            if inner.closed {
                return Err(EnqueueError {
                    reason: QueueError::Closed,
                    kind,
                    item,
                });
            }
            if inner.entries.try_reserve(1).is_err() {
                return Err(EnqueueError {
                    reason: QueueError::OutOfMemory,
                    kind,
                    item,
                });
            }
            inner.entries.push_back((kind, item));
            inner.signal.clone()
        };

        self.not_empty.notify_one();
        if let Some(signal) = signal {
            signal.notify_one();
        }
        Ok(())
    }

    /// Remove the head item, blocking while the queue is open and empty.
    ///
    /// Returns `None` once the queue is closed and drained.
    pub fn dequeue_blocking(&self) -> Option<(ItemKind, T)> {
        let mut inner = lock(&self.inner);
        loop {
            if let Some(entry) = inner.entries.pop_front() {
                return Some(entry);
            }
            if inner.closed {
                return None;
            }
            inner = self
                .not_empty
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Remove the head item without blocking
    pub fn try_dequeue(&self) -> Option<(ItemKind, T)> {
        lock(&self.inner).entries.pop_front()
    }

    /// Mark the queue closed and wake every waiter, direct or via the set.
    pub fn close(&self) {
        let signal = {
            let mut inner = lock(&self.inner);
            if inner.closed {
                return;
            }
            inner.closed = true;
            inner.signal.clone()
        };

        self.not_empty.notify_all();
        if let Some(signal) = signal {
            signal.notify_all();
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.inner).entries.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.inner).closed
    }

    pub(crate) fn poll(&self) -> Poll<T> {
        let mut inner = lock(&self.inner);
        match inner.entries.pop_front() {
            Some((kind, item)) => Poll::Ready(kind, item),
            None => Poll::Empty {
                closed: inner.closed,
            },
        }
    }

    pub(crate) fn attach(&self, signal: Arc<Signal>) -> Result<(), QueueError> {
        let mut inner = lock(&self.inner);
        if inner.signal.is_some() {
            return Err(QueueError::AlreadyMember);
        }
        inner.signal = Some(signal);
        Ok(())
    }

    pub(crate) fn detach(&self) {
        lock(&self.inner).signal = None;
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("Queue")
            .field("len", &inner.entries.len())
            .field("closed", &inner.closed)
            .finish()
    }
}
