//! Fixed-interval bounded retry.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("gave up after {attempts} attempts")]
pub struct RetryExhausted {
    pub attempts: u32,
}

/// Run a probe up to `max_attempts` times, sleeping `interval` between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Probe until it yields `Ok(true)`. Returns the attempt number that succeeded.
    ///
    /// `Ok(false)` and `Err(_)` both count as a failed attempt and are logged.
    /// There is no sleep after the final attempt.
    pub async fn run<F, Fut, E>(&self, what: &str, mut probe: F) -> Result<u32, RetryExhausted>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<bool, E>>,
        E: Display,
    {
        for attempt in 1..=self.max_attempts {
            match probe(attempt).await {
                Ok(true) => return Ok(attempt),
                Ok(false) => {
                    tracing::warn!("{} probe {}/{} failed", what, attempt, self.max_attempts)
                }
                Err(e) => tracing::warn!(
                    "{} probe {}/{} failed: {}. Retrying...",
                    what,
                    attempt,
                    self.max_attempts,
                    e
                ),
            }
            if attempt < self.max_attempts {
                tokio::time::sleep(self.interval).await;
            }
        }
        Err(RetryExhausted {
            attempts: self.max_attempts,
        })
    }
}
