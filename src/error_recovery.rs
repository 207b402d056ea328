// src/error_recovery.rs
//! Retry with exponential backoff for resource downloads.

use crate::constants::{FETCH_INITIAL_BACKOFF_MS, FETCH_MAX_ATTEMPTS, FETCH_MAX_BACKOFF_MS};
use crate::error::FetchFailure;
use std::time::Duration;

/// How hard a download is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// A policy that never sleeps; for tests and stub backends.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Runs `operation` under this policy, retrying retryable failures.
    pub fn run<F, T>(&self, operation: F) -> Result<T, FetchFailure>
    where
        F: FnMut() -> Result<T, FetchFailure>,
    {
        retry_with_backoff(
            operation,
            FetchFailure::is_retryable,
            self.max_attempts,
            self.initial_delay,
            self.max_delay,
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: FETCH_MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(FETCH_INITIAL_BACKOFF_MS),
            max_delay: Duration::from_millis(FETCH_MAX_BACKOFF_MS),
        }
    }
}

/// Retries an operation with exponential backoff.
///
/// Errors for which `should_retry` is false are returned at once.
pub fn retry_with_backoff<F, T, E, R>(
    mut operation: F,
    should_retry: R,
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    R: Fn(&E) -> bool,
{
    let mut delay = initial_delay;
    let mut attempt = 1;

    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) if attempt < max_attempts.max(1) && should_retry(&e) => {
                log::warn!("Attempt {} failed, retrying after {:?}", attempt, delay);
                std::thread::sleep(delay);

                // Exponential backoff with cap
                delay = std::cmp::min(delay * 2, max_delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
