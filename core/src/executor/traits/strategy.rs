use std::time::Duration;

use crate::error::DeviceError;

/// Retry policy for one pipeline stage.
pub trait RetryStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Retries allowed after the first attempt.
    fn max_retries(&self) -> u32;

    /// Delay before retry number `retry` (0-based) after `error`; `None` stops retrying.
    fn next_delay(&self, retry: u32, error: &DeviceError) -> Option<Duration>;

    fn should_retry(&self, retry: u32, error: &DeviceError) -> bool {
        retry < self.max_retries() && error.is_retryable()
    }
}

/// Single attempt, never retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryStrategy for NoRetry {
    fn name(&self) -> &str {
        "none"
    }

    fn max_retries(&self) -> u32 {
        0
    }

    fn next_delay(&self, _retry: u32, _error: &DeviceError) -> Option<Duration> {
        None
    }
}

/// Same delay before every retry.
#[derive(Debug, Clone, Copy)]
pub struct FixedRetry {
    pub retries: u32,
    pub delay: Duration,
}

impl RetryStrategy for FixedRetry {
    fn name(&self) -> &str {
        "fixed"
    }

    fn max_retries(&self) -> u32 {
        self.retries
    }

    fn next_delay(&self, retry: u32, _error: &DeviceError) -> Option<Duration> {
        (retry < self.retries).then_some(self.delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_retry_never_retries() {
        let err = DeviceError::Connection("reset".into());
        assert!(!NoRetry.should_retry(0, &err));
    }

    #[test]
    fn test_fixed_retry_respects_taxonomy() {
        let strategy = FixedRetry {
            retries: 2,
            delay: Duration::from_millis(10),
        };
        let transient = DeviceError::Connection("reset".into());
        let auth = DeviceError::Authentication("denied".into());

        assert!(strategy.should_retry(0, &transient));
        assert!(strategy.should_retry(1, &transient));
        assert!(!strategy.should_retry(2, &transient));
        assert!(!strategy.should_retry(0, &auth));
        assert_eq!(strategy.next_delay(2, &transient), None);
    }
}
