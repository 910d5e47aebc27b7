// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Retry logic with exponential backoff.
//!
//! The policy is a stateless value (attempt bound, base delay, multiplier,
//! cap), independent of the operation it wraps. Backoff waits are raced
//! against a cancellation token so a shutdown-in-progress never sits out a
//! multi-second delay.
//!
//! # Example
//!
//! ```
//! use batch_engine::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::default();
//! assert_eq!(policy.max_attempts, 5);
//! assert_eq!(policy.initial_delay, Duration::from_millis(200));
//! assert_eq!(policy.max_delay, Duration::from_secs(5));
//! ```

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Bounded exponential backoff policy.
///
/// After a failed attempt the wait starts at `initial_delay` and is
/// multiplied by `factor` after each further failure, never exceeding
/// `max_delay`. No wait follows the final attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            factor: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Fast retry for tests (minimal delays)
    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            factor: 2.0,
        }
    }
}

/// Outcome of an exhausted or aborted retry loop.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Every attempt failed; carries the count and the *last* attempt's
    /// error. Intermediate failures are logged and counted, not aggregated.
    #[error("operation failed after {attempts} attempts: {source}")]
    Exhausted { attempts: usize, source: E },

    /// The cancellation token fired during a backoff wait.
    #[error("cancelled while waiting to retry")]
    Cancelled,
}

/// Run `operation` up to `policy.max_attempts` times with exponential
/// backoff between failures.
///
/// The backoff wait races `cancel`; if the token fires mid-wait the loop
/// aborts immediately with [`RetryError::Cancelled`] instead of the
/// operation's error. Cancellation is only observed between attempts - an
/// attempt already in flight runs to completion.
pub async fn retry_with_backoff<F, Fut, T, E>(
    operation_name: &str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = policy.initial_delay;
    let mut attempts = 0;

    loop {
        match operation().await {
            Ok(val) => {
                if attempts > 0 {
                    info!(
                        operation = operation_name,
                        retries = attempts,
                        "operation succeeded after retries"
                    );
                }
                return Ok(val);
            }
            Err(err) => {
                attempts += 1;

                if attempts >= policy.max_attempts {
                    warn!(
                        operation = operation_name,
                        attempts,
                        error = %err,
                        "operation failed, attempts exhausted"
                    );
                    return Err(RetryError::Exhausted {
                        attempts,
                        source: err,
                    });
                }

                warn!(
                    operation = operation_name,
                    attempt = attempts,
                    max_attempts = policy.max_attempts,
                    error = %err,
                    delay_ms = delay.as_millis() as u64,
                    "operation failed, backing off before retry"
                );

                tokio::select! {
                    _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                    _ = sleep(delay) => {}
                }

                delay = delay.mul_f64(policy.factor).min(policy.max_delay);
            }
        }
    }
}
