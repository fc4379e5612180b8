//! Retry policy for idempotent gateway calls.
//!
//! Only calls that create nothing on the gateway side (authentication and
//! transaction lookups) go through here. Order registration and payment key
//! issuance are never repeated automatically.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::ports::GatewayError;

/// Default number of attempts for idempotent calls.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Default delay unit between attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(250);

/// Linear backoff retry for retryable gateway errors.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    /// `max_attempts` below one is treated as one.
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs `call` until it succeeds, fails with a non-retryable error or
    /// the attempts are exhausted.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if err.retryable && attempt < self.max_attempts => {
                    tracing::warn!(
                        operation,
                        attempt,
                        error = %err,
                        "Gateway call failed, retrying"
                    );
                    // Linear: 250ms, 500ms, ...
                    sleep(self.backoff * attempt).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BACKOFF)
    }
}
