// Peer Queue Configuration

use crate::application::worker::constants::{
    DEFAULT_QUEUE_CAPACITY, DEFAULT_THREAD_NAME, DEFAULT_WORKER_COUNT,
};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Peer queue configuration
///
/// One worker is the default: peer messages are then processed strictly in
/// arrival order and never concurrently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerQueueConfig {
    /// Number of worker threads sharing the queue set
    pub workers: usize,
    /// Worker threads are named `<thread_name>-<id>`
    pub thread_name: String,
    /// Items reserved up front when the service queue is allocated
    pub queue_capacity: usize,
}

impl PeerQueueConfig {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(AppError::Config("workers must be at least 1".to_string()));
        }
        if self.thread_name.trim().is_empty() {
            return Err(AppError::Config("thread_name cannot be empty".to_string()));
        }
        if self.thread_name.contains('\0') {
            return Err(AppError::Config(
                "thread_name cannot contain NUL bytes".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PeerQueueConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKER_COUNT,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_single_worker() {
        let config = PeerQueueConfig::default();
        assert_eq!(config.workers, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let result = PeerQueueConfig::new(0).validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("at least 1"));
    }

    #[test]
    fn test_blank_thread_name_rejected() {
        let config = PeerQueueConfig {
            thread_name: "  ".to_string(),
            ..PeerQueueConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PeerQueueConfig = serde_json::from_str(r#"{"workers": 4}"#).unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.thread_name, DEFAULT_THREAD_NAME);
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn test_nul_thread_name_rejected() {
        let config = PeerQueueConfig {
            thread_name: "mp\0eer".to_string(),
            ..PeerQueueConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("NUL"));
    }
}
