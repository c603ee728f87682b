// Shared wake-up signal of a queue set

use super::lock;
use std::sync::{Condvar, Mutex};

#[derive(Debug, Default)]
struct SignalState {
    /// Bumped on every enqueue and close of a member queue
    generation: u64,
    /// Pending explicit exit requests
    resumes: usize,
}

/// Generation counter guarded by a condvar.
///
/// A waiter snapshots the generation before scanning the member queues and
/// only sleeps while it is unchanged, so a wake that lands between the scan
/// and the sleep is never lost.
#[derive(Debug, Default)]
pub(crate) struct Signal {
    state: Mutex<SignalState>,
    cond: Condvar,
}

/// Outcome of `Signal::wait_change`
pub(crate) enum Wake {
    /// Something changed, rescan the members
    Changed,
    /// An exit was requested and consumed
    Resumed,
}

impl Signal {
    pub(crate) fn generation(&self) -> u64 {
        lock(&self.state).generation
    }

    pub(crate) fn notify_one(&self) {
        let mut state = lock(&self.state);
        state.generation = state.generation.wrapping_add(1);
        self.cond.notify_one();
    }

    pub(crate) fn notify_all(&self) {
        let mut state = lock(&self.state);
        state.generation = state.generation.wrapping_add(1);
        self.cond.notify_all();
    }

    pub(crate) fn resume_one(&self) {
        let mut state = lock(&self.state);
        state.resumes += 1;
        self.cond.notify_one();
    }

    pub(crate) fn discard_resumes(&self) {
        lock(&self.state).resumes = 0;
    }

    /// Block until the generation moves past `seen` or an exit is pending.
    pub(crate) fn wait_change(&self, seen: u64) -> Wake {
        let mut state = lock(&self.state);
        loop {
            // Pending work wins over an exit request
            if state.generation != seen {
                return Wake::Changed;
            }
            if state.resumes > 0 {
                state.resumes -= 1;
                return Wake::Resumed;
            }
            state = self
                .cond
                .wait(state)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }
}
