// Peer Handler Port
// Builds, processes and releases message items on behalf of the mnode

use crate::domain::{MsgType, PeerMsg, PeerRequest, RpcMsg, StatusCode};
use thiserror::Error;

/// Item construction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    #[error("Invalid message length: {0}")]
    InvalidLength(usize),

    #[error("Invalid message content: {0}")]
    InvalidContent(String),

    #[error("Unsupported message type: {0}")]
    UnsupportedType(MsgType),
}

impl HandlerError {
    /// Status code reported back to the sender
    pub fn status_code(&self) -> StatusCode {
        match self {
            HandlerError::InvalidLength(_) => StatusCode::INVALID_MSG_LEN,
            HandlerError::InvalidContent(_) => StatusCode::INVALID_MSG_CONTENT,
            HandlerError::UnsupportedType(_) => StatusCode::INVALID_MSG_TYPE,
        }
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::InvalidContent(err.to_string())
    }
}

/// Handler collaborator of the peer queue.
///
/// `process` runs on worker threads and must not block indefinitely.
#[cfg_attr(test, mockall::automock)]
pub trait PeerHandler: Send + Sync {
    /// Populate a freshly allocated item from the raw transport message.
    ///
    /// The default decodes a JSON body into the `PeerRequest` variant
    /// selected by the message type.
    ///
    /// # Errors
    /// - `HandlerError::InvalidLength` on an empty body
    /// - `HandlerError::InvalidContent` if the body does not decode
    fn create_msg(&self, item: &mut PeerMsg, raw: &RpcMsg) -> Result<(), HandlerError> {
        if raw.content.is_empty() {
            return Err(HandlerError::InvalidLength(0));
        }
        item.set_request(PeerRequest::decode(raw.msg_type, &raw.content)?);
        Ok(())
    }

    /// Process one item and return its status.
    ///
    /// Returning `StatusCode::ACTION_IN_PROGRESS` suppresses the response;
    /// the handler then answers later through its own path and must have
    /// copied whatever it needs out of the item.
    fn process(&self, item: &mut PeerMsg) -> StatusCode;

    /// Release an item. Called exactly once per allocated item.
    fn release(&self, item: PeerMsg) {
        drop(item);
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::RpcHandle;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Mock handler behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Answer with `SUCCESS`
        Success,
        /// Answer with the given code
        Fail(StatusCode),
        /// Answer with `ACTION_IN_PROGRESS`
        InProgress,
        /// Panic with message (for panic isolation testing)
        Panic(String),
    }

    /// Handler that records what it processed and released
    pub struct RecordingHandler {
        default: MockBehavior,
        overrides: Mutex<HashMap<RpcHandle, MockBehavior>>,
        delay: Option<Duration>,
        processed: Mutex<Vec<(MsgType, RpcHandle)>>,
        released: Mutex<Vec<RpcHandle>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl RecordingHandler {
        pub fn new(default: MockBehavior) -> Self {
            Self {
                default,
                overrides: Mutex::new(HashMap::new()),
                delay: None,
                processed: Mutex::new(Vec::new()),
                released: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        pub fn new_success() -> Self {
            Self::new(MockBehavior::Success)
        }

        /// Sleep this long inside every `process` call
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Use `behavior` for the item carrying `handle`
        pub fn set_behavior(&self, handle: RpcHandle, behavior: MockBehavior) {
            self.overrides.lock().unwrap().insert(handle, behavior);
        }

        pub fn processed(&self) -> Vec<(MsgType, RpcHandle)> {
            self.processed.lock().unwrap().clone()
        }

        pub fn released(&self) -> Vec<RpcHandle> {
            self.released.lock().unwrap().clone()
        }

        /// Highest number of concurrent `process` calls observed
        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }
    }

    impl PeerHandler for RecordingHandler {
        fn process(&self, item: &mut PeerMsg) -> StatusCode {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.processed
                .lock()
                .unwrap()
                .push((item.msg_type, item.handle));

            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }

            let behavior = self
                .overrides
                .lock()
                .unwrap()
                .get(&item.handle)
                .cloned()
                .unwrap_or_else(|| self.default.clone());
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match behavior {
                MockBehavior::Success => {
                    item.set_response(format!("ok:{}", item.msg_type).into_bytes());
                    StatusCode::SUCCESS
                }
                MockBehavior::Fail(code) => code,
                MockBehavior::InProgress => StatusCode::ACTION_IN_PROGRESS,
                MockBehavior::Panic(msg) => panic!("{}", msg),
            }
        }

        fn release(&self, item: PeerMsg) {
            self.released.lock().unwrap().push(item.handle);
        }
    }
}
