// Response Transport Port

use crate::domain::RpcResponse;

/// Delivers a response back to the sender. Fire-and-forget for the core.
#[cfg_attr(test, mockall::automock)]
pub trait ResponseTransport: Send + Sync {
    fn send_response(&self, rsp: RpcResponse);
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Condvar, Mutex};
    use std::time::{Duration, Instant};

    /// Transport that keeps every response for inspection
    #[derive(Default)]
    pub struct RecordingTransport {
        sent: Mutex<Vec<RpcResponse>>,
        arrived: Condvar,
    }

    impl RecordingTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn responses(&self) -> Vec<RpcResponse> {
            self.sent.lock().unwrap().clone()
        }

        /// Block until at least `count` responses arrived or `timeout` passed.
        /// Returns whether the count was reached.
        pub fn wait_for(&self, count: usize, timeout: Duration) -> bool {
            let deadline = Instant::now() + timeout;
            let mut sent = self.sent.lock().unwrap();
            while sent.len() < count {
                let now = Instant::now();
                if now >= deadline {
                    return false;
                }
                sent = self.arrived.wait_timeout(sent, deadline - now).unwrap().0;
            }
            true
        }
    }

    impl ResponseTransport for RecordingTransport {
        fn send_response(&self, rsp: RpcResponse) {
            self.sent.lock().unwrap().push(rsp);
            self.arrived.notify_all();
        }
    }
}
