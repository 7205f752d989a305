use rand::Rng;
use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::models::config::RetryConfig;

/// Statuses worth re-issuing: timeouts, rate limits and gateway failures.
const RETRYABLE_STATUSES: [u16; 5] = [408, 429, 502, 503, 504];

const JITTER_MIN: f64 = 0.5;
const JITTER_MAX: f64 = 1.5;

/// Whether a call may be re-issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryMode {
    Retry,
    /// Send once; for endpoints that must not run twice.
    Once,
}

/// Exponential backoff with jitter for retryable HTTP statuses.
///
/// Delay before retry `n` (1-based) is `min(max_delay, base_delay * 2^n * jitter)`
/// with `jitter` drawn from `[0.5, 1.5)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, config.base_delay_ms, config.max_delay_ms)
    }
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms,
        }
    }

    /// Policy that never retries.
    pub const fn disabled() -> Self {
        Self::new(0, 0, 0)
    }

    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn is_retryable_status(status: StatusCode) -> bool {
        RETRYABLE_STATUSES.contains(&status.as_u16())
    }

    /// Backoff for `attempt` with an explicit jitter factor.
    pub fn delay_for(&self, attempt: u32, jitter: f64) -> Duration {
        let exponential = self
            .base_delay_ms
            .saturating_mul(2_u64.saturating_pow(attempt)) as f64;
        let millis = (exponential * jitter).min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(millis as u64)
    }

    /// Backoff for `attempt` with random jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let jitter = rand::thread_rng().gen_range(JITTER_MIN..JITTER_MAX);
        self.delay_for(attempt, jitter)
    }

    /// Issue a request, re-issuing it while the status is retryable.
    ///
    /// At most `max_retries + 1` requests are made. The last response is
    /// returned whatever its status. Transport errors are returned at once.
    pub async fn send<F, Fut>(&self, mut op: F) -> Result<reqwest::Response, reqwest::Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let mut attempt = 0;
        loop {
            let response = op().await?;
            let status = response.status();

            if !Self::is_retryable_status(status) || attempt >= self.max_retries {
                if attempt > 0 {
                    debug!(attempts = attempt + 1, status = %status, "request finished after retries");
                }
                return Ok(response);
            }

            attempt += 1;
            let delay = self.backoff(attempt);
            warn!(
                status = %status,
                attempt,
                max_retries = self.max_retries,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "retryable status, backing off"
            );
            drop(response);
            sleep(delay).await;
        }
    }
}
