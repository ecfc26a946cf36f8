//! Exponential backoff with jitter for registry lookups

use crate::error::Result;
use std::future::Future;
use std::time::Duration;

/// How many times, and how patiently, a failed lookup is repeated.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 disables retrying)
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
    /// Relative jitter applied to each delay (0.1 = ±10%)
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-based), without jitter
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Delay before retry number `attempt` (0-based), with jitter applied
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self.base_delay(attempt).as_secs_f64();
        let spread = delay * self.jitter;
        let offset = (rand::random::<f64>() - 0.5) * 2.0 * spread;
        Duration::from_secs_f64((delay + offset).max(0.0))
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the policy's retries are used up. The last error is returned.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => {
                tracing::debug!(package = label, error = %e, "not retrying");
                return Err(e);
            }
            Err(e) if attempt >= policy.max_retries => {
                tracing::debug!(
                    package = label,
                    attempts = attempt + 1,
                    error = %e,
                    "retries exhausted"
                );
                return Err(e);
            }
            Err(e) => {
                let delay = policy.delay_for(attempt);
                tracing::debug!(
                    package = label,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying lookup"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
