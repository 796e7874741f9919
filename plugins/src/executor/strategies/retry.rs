use std::time::Duration;

use netsentinel_core::config::RetryConfig;
use netsentinel_core::error::DeviceError;
use netsentinel_core::executor::RetryStrategy;

/// How the pause grows with each retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Growth {
    /// base, 2*base, 4*base, ...
    Exponential,
    /// base, 2*base, 3*base, ...
    Linear,
}

impl Growth {
    fn factor(self, retry: u32) -> u64 {
        match self {
            Growth::Exponential => 1u64 << retry.min(30),
            Growth::Linear => u64::from(retry) + 1,
        }
    }
}

/// Bounded retry whose pause depends on the kind of device fault.
///
/// A refused or dropped connection and an unavailable inference endpoint back off along
/// the growth curve, capped at `max_delay_ms`. A timed out command or generation retries
/// after the flat base delay.
#[derive(Debug, Clone)]
pub struct BackoffRetry {
    growth: Growth,
    max_retries: u32,
    base: Duration,
    cap: Duration,
}

impl BackoffRetry {
    pub fn new(growth: Growth, cfg: &RetryConfig) -> Self {
        Self {
            growth,
            max_retries: cfg.max_retries,
            base: Duration::from_millis(cfg.base_delay_ms),
            cap: Duration::from_millis(cfg.max_delay_ms.max(cfg.base_delay_ms)),
        }
    }

    /// Doubling pause: `strategy = "exponential-backoff"`.
    pub fn exponential(cfg: &RetryConfig) -> Self {
        Self::new(Growth::Exponential, cfg)
    }

    /// Pause grows by the base delay each retry: `strategy = "linear"`.
    pub fn linear(cfg: &RetryConfig) -> Self {
        Self::new(Growth::Linear, cfg)
    }

    fn grown(&self, retry: u32) -> Duration {
        let factor = u32::try_from(self.growth.factor(retry)).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.cap)
    }
}

impl RetryStrategy for BackoffRetry {
    fn name(&self) -> &str {
        match self.growth {
            Growth::Exponential => "exponential-backoff",
            Growth::Linear => "linear",
        }
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn next_delay(&self, retry: u32, error: &DeviceError) -> Option<Duration> {
        if retry >= self.max_retries {
            return None;
        }
        match error {
            DeviceError::Connection(_) | DeviceError::InferenceUnavailable(_) => {
                Some(self.grown(retry))
            }
            DeviceError::CommandTimeout { .. } | DeviceError::InferenceTimeout { .. } => {
                Some(self.base)
            }
            DeviceError::Authentication(_)
            | DeviceError::InferenceRejected(_)
            | DeviceError::Cancelled => None,
        }
    }
}
