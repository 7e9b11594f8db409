use std::{future::Future, time::Duration};

use async_trait::async_trait;

use crate::config::RetryConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after failed attempt `attempt` (1-based):
    /// `initial_delay * 2^(attempt - 1)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        self.initial_delay.saturating_mul(1_u32 << exp)
    }

    pub fn can_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts()
    }
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetryError<E> {
    /// The operation failed with an error the predicate refused to retry.
    Permanent { error: E, attempts: u32 },
    /// Every attempt in the budget failed with a retryable error.
    Exhausted { last_error: E, attempts: u32 },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Permanent { attempts, .. } | RetryError::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn into_error(self) -> E {
        match self {
            RetryError::Permanent { error, .. } => error,
            RetryError::Exhausted { last_error, .. } => last_error,
        }
    }
}

/// Runs `operation` until it succeeds, fails with an error `is_retryable`
/// rejects, or the attempt budget is spent. The operation receives the 1-based
/// attempt number. No delay follows the final attempt.
pub async fn retry_with_backoff<T, E, Op, Fut, P>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    mut operation: Op,
    is_retryable: P,
) -> Result<T, RetryError<E>>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 1_u32;
    loop {
        let error = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !is_retryable(&error) {
            return Err(RetryError::Permanent {
                error,
                attempts: attempt,
            });
        }
        if !policy.can_retry(attempt) {
            return Err(RetryError::Exhausted {
                last_error: error,
                attempts: attempt,
            });
        }

        let delay = policy.backoff_delay(attempt);
        tracing::debug!(
            target: "reliability",
            attempt = attempt,
            delay_ms = delay.as_millis() as u64,
            "retry_scheduled"
        );
        sleeper.sleep(delay).await;
        attempt += 1;
    }
}
