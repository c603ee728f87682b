// Redirect Port - tells a rejected sender where to go instead

use crate::domain::{MsgType, RpcHandle};

/// Invoked synchronously when the gateway rejects a message.
///
/// The semantics of a redirect (which node to point at, how the response is
/// framed) belong to the implementor.
#[cfg_attr(test, mockall::automock)]
pub trait Redirector: Send + Sync {
    fn redirect(&self, msg_type: MsgType, handle: RpcHandle, is_retry: bool);
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Recorded redirect call
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RedirectCall {
        pub msg_type: MsgType,
        pub handle: RpcHandle,
        pub is_retry: bool,
    }

    /// Redirector that only records its calls
    #[derive(Default)]
    pub struct RecordingRedirector {
        calls: Mutex<Vec<RedirectCall>>,
    }

    impl RecordingRedirector {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<RedirectCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Redirector for RecordingRedirector {
        fn redirect(&self, msg_type: MsgType, handle: RpcHandle, is_retry: bool) {
            self.calls.lock().unwrap().push(RedirectCall {
                msg_type,
                handle,
                is_retry,
            });
        }
    }
}
