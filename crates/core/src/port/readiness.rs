// Readiness Port - is the mnode accepting peer messages?

use std::sync::atomic::{AtomicBool, Ordering};

/// Readiness predicate consulted by the dispatch gateway before enqueue
#[cfg_attr(test, mockall::automock)]
pub trait ReadinessProbe: Send + Sync {
    fn is_running(&self) -> bool;
}

/// Flag-backed readiness, flipped by whoever owns the mnode lifecycle
#[derive(Debug, Default)]
pub struct ReadinessFlag {
    running: AtomicBool,
}

impl ReadinessFlag {
    pub fn new(running: bool) -> Self {
        Self {
            running: AtomicBool::new(running),
        }
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }
}

impl ReadinessProbe for ReadinessFlag {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}
