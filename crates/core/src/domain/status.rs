// Status Codes returned by peer handlers and carried in responses

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status code of a processed peer message.
///
/// The core never interprets codes beyond `ACTION_IN_PROGRESS`; any other
/// value flows back to the sender unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub i32);

impl StatusCode {
    pub const SUCCESS: StatusCode = StatusCode(0);
    /// Handler will answer later through another path; no response now.
    pub const ACTION_IN_PROGRESS: StatusCode = StatusCode(1);
    pub const REDIRECT: StatusCode = StatusCode(2);
    pub const NOT_READY: StatusCode = StatusCode(3);
    pub const OUT_OF_MEMORY: StatusCode = StatusCode(0x0101);
    pub const INVALID_MSG_LEN: StatusCode = StatusCode(0x0201);
    pub const INVALID_MSG_CONTENT: StatusCode = StatusCode(0x0202);
    pub const INVALID_MSG_TYPE: StatusCode = StatusCode(0x0203);
    pub const UNEXPECTED: StatusCode = StatusCode(0x0301);

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    pub fn is_in_progress(self) -> bool {
        self == Self::ACTION_IN_PROGRESS
    }

    fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::SUCCESS => "success",
            Self::ACTION_IN_PROGRESS => "action in progress",
            Self::REDIRECT => "redirect",
            Self::NOT_READY => "not ready",
            Self::OUT_OF_MEMORY => "out of memory",
            Self::INVALID_MSG_LEN => "invalid message length",
            Self::INVALID_MSG_CONTENT => "invalid message content",
            Self::INVALID_MSG_TYPE => "invalid message type",
            Self::UNEXPECTED => "unexpected error",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({:#06x})", name, self.0),
            None => write!(f, "{:#06x}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_progress_is_distinct() {
        assert!(StatusCode::ACTION_IN_PROGRESS.is_in_progress());
        assert!(!StatusCode::ACTION_IN_PROGRESS.is_success());
        assert!(!StatusCode::SUCCESS.is_in_progress());
        assert!(!StatusCode(42).is_in_progress());
    }

    #[test]
    fn test_display() {
        assert_eq!(StatusCode::SUCCESS.to_string(), "success (0x0000)");
        assert_eq!(StatusCode(0x7777).to_string(), "0x7777");
    }
}
