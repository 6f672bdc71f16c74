//! Retry policy and per-attempt progress events.

use std::fmt;
use std::time::Duration;

use crate::translations::error::TranslationError;

/// Default number of attempts per item.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);

/// Exponential backoff policy.
///
/// The delay before attempt `n` (1-based, `n >= 2`) is
/// `base_delay * 2^(n - 2)`: 2s, 4s, 8s... with the default base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Create a policy; at least one attempt is always made.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Policy without waits between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Delay to wait before the given attempt.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 2).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

/// Classification of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Request exceeded the timeout.
    Timeout,
    /// Payload did not match the catalog checksum.
    Integrity,
    /// Server answered with a non-200 status.
    Http,
    /// Connection or transfer failure.
    Network,
    /// Local filesystem failure while publishing.
    Io,
}

impl FailureKind {
    /// Classify an error.
    pub fn of(error: &TranslationError) -> Self {
        match error {
            TranslationError::Timeout { .. } => Self::Timeout,
            TranslationError::ChecksumMismatch { .. } => Self::Integrity,
            TranslationError::HttpStatus { .. } => Self::Http,
            TranslationError::DownloadFailed { .. } => Self::Network,
            _ => Self::Io,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Timeout => "timeout",
            Self::Integrity => "integrity mismatch",
            Self::Http => "HTTP error",
            Self::Network => "network error",
            Self::Io => "I/O error",
        };
        f.write_str(name)
    }
}

/// Progress of a fetch with retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    /// An attempt is starting.
    Attempt {
        attempt: u32,
        max_attempts: u32,
        url: String,
    },
    /// The attempt succeeded and the file was published.
    Succeeded { attempt: u32, bytes: u64 },
    /// The attempt failed.
    Failed {
        attempt: u32,
        kind: FailureKind,
        error: String,
    },
    /// Waiting before the next attempt.
    Backoff { delay: Duration },
    /// All attempts failed.
    GaveUp { attempts: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::new(4, Duration::from_millis(500));
        assert_eq!(policy.delay_before(1), Duration::ZERO);
        assert_eq!(policy.delay_before(2), Duration::from_millis(500));
        assert_eq!(policy.delay_before(3), Duration::from_millis(1000));
        assert_eq!(policy.delay_before(4), Duration::from_millis(2000));
    }

    #[test]
    fn test_minimum_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[test]
    fn test_failure_kind_classification() {
        let integrity = TranslationError::ChecksumMismatch {
            filename: "TR001.gz".into(),
            expected: "a".into(),
            actual: "b".into(),
        };
        let http = TranslationError::HttpStatus {
            url: "u".into(),
            status: 500,
        };
        assert_eq!(FailureKind::of(&integrity), FailureKind::Integrity);
        assert_eq!(FailureKind::of(&http), FailureKind::Http);
        assert_eq!(FailureKind::of(&TranslationError::AlreadyRunning), FailureKind::Io);
        assert_eq!(FailureKind::Integrity.to_string(), "integrity mismatch");
    }
}
