// Central Error Type for the Peer Queue

use crate::domain::MsgType;
use crate::port::HandlerError;
use crate::queue::QueueError;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    #[error("Subsystem unavailable, {msg_type} redirected")]
    SubsystemUnavailable { msg_type: MsgType },

    #[error("Failed to spawn worker thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),

    #[error("Service queue already allocated")]
    AlreadyAllocated,

    #[error("Invalid message: {0}")]
    InvalidMessage(#[from] HandlerError),

    #[error("Queue error: {0}")]
    Queue(QueueError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::OutOfMemory => AppError::OutOfMemory("queue storage".to_string()),
            other => AppError::Queue(other),
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_oom_maps_to_out_of_memory() {
        let err: AppError = QueueError::OutOfMemory.into();
        assert!(matches!(err, AppError::OutOfMemory(_)));

        let err: AppError = QueueError::Closed.into();
        assert!(matches!(err, AppError::Queue(QueueError::Closed)));
    }

    #[test]
    fn test_unavailable_message_names_type() {
        let err = AppError::SubsystemUnavailable {
            msg_type: MsgType::Grant,
        };
        assert!(err.to_string().contains("grant"));
    }
}
