//! Retry with exponential backoff for retrieval calls.
//!
//! The policy is fail-open: once every attempt has failed the error is logged
//! and an empty result returned, so one broken source never sinks a turn.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::context::TurnContext;

/// How often and how patiently to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
        }
    }

    /// Wait after the failed attempt number `attempt` (counted from 0).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor)
    }
}

/// Call `op` until it succeeds or the policy is exhausted.
///
/// Returns the successful result, or an empty vector after the last failure
/// or when the turn is cancelled mid-way.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    ctx: &TurnContext,
    mut op: F,
) -> Vec<T>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
{
    for attempt in 0..policy.max_attempts {
        let outcome = match ctx.guard(op()).await {
            Ok(outcome) => outcome,
            Err(interrupted) => {
                tracing::debug!(source = label, reason = %interrupted, "retrieval interrupted");
                return Vec::new();
            }
        };

        let err = match outcome {
            Ok(items) => return items,
            Err(e) => e,
        };

        if attempt + 1 >= policy.max_attempts {
            tracing::error!(
                source = label,
                attempts = policy.max_attempts,
                error = %err,
                "retrieval failed, giving up"
            );
            break;
        }

        let delay = policy.delay_for(attempt);
        tracing::warn!(
            source = label,
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "retrieval attempt failed, retrying"
        );
        if ctx.guard(tokio::time::sleep(delay)).await.is_err() {
            return Vec::new();
        }
    }

    Vec::new()
}
