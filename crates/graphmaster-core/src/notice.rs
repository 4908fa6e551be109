//! Non-blocking user notifications (toasts).

use serde::{Deserialize, Serialize};

/// Default time a notice stays on screen.
pub const DEFAULT_NOTICE_MS: u32 = 3000;
/// Time an error notice stays on screen.
pub const ERROR_NOTICE_MS: u32 = 5000;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A message for the host to show without interrupting the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub duration_ms: u32,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        let duration_ms = match level {
            NoticeLevel::Error => ERROR_NOTICE_MS,
            _ => DEFAULT_NOTICE_MS,
        };
        Self {
            level,
            message: message.into(),
            duration_ms,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_durations() {
        assert_eq!(Notice::info("Cleared").duration_ms, 3000);
        assert_eq!(Notice::success("Copied").duration_ms, 3000);
        assert_eq!(Notice::error("Render error").duration_ms, 5000);
    }
}
