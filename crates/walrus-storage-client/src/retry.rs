//! Retry state machine for uploads
//!
//! An upload moves through `Attempting(n)` until it either succeeds, hits a
//! permanent error, or spends the whole attempt budget:
//!
//! ```text
//! Attempting(1) ──ok──────────────▶ Succeeded
//!      │
//!      └─transient─▶ sleep(1 × base) ─▶ Attempting(2) ─ … ─▶ Attempting(max)
//!                                                               │
//!                                                   transient ──┴─▶ Exhausted
//! ```
//!
//! Timeouts are transient: they keep their own message but still spend an
//! attempt.

use crate::error::{Result, StorageError};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Linear-backoff retry budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first one included
    pub max_attempts: u32,
    /// Delay after attempt `n` is `n × base_delay`
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1500),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting. Errors surface as-is, without the
    /// `Exhausted` wrapper.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    /// Classify the result of one attempt.
    pub fn outcome<T>(&self, attempt: u32, result: Result<T>) -> AttemptOutcome<T> {
        match result {
            Ok(value) => AttemptOutcome::Succeeded(value),
            Err(e) if !e.is_transient() || self.max_attempts <= 1 => AttemptOutcome::Failed(e),
            Err(e) if attempt >= self.max_attempts => AttemptOutcome::Exhausted(StorageError::Exhausted {
                attempts: attempt,
                last: Box::new(e),
            }),
            Err(e) => AttemptOutcome::Retry {
                error: e,
                delay: self.delay_after(attempt),
            },
        }
    }

    /// Drive `op` through the state machine. `op` receives the 1-based
    /// attempt number.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match self.outcome(attempt, op(attempt).await) {
                AttemptOutcome::Succeeded(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                AttemptOutcome::Failed(e) | AttemptOutcome::Exhausted(e) => return Err(e),
                AttemptOutcome::Retry { error, delay } => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        timeout = error.is_timeout(),
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Where one attempt left the state machine
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    Succeeded(T),
    /// Transient failure with budget left; wait `delay` then try again
    Retry { error: StorageError, delay: Duration },
    /// Transient failure on the last attempt, wrapped as `Exhausted`
    Exhausted(StorageError),
    /// Permanent failure, surfaced as-is
    Failed(StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn unavailable() -> StorageError {
        StorageError::Status {
            status: 503,
            message: "unavailable".into(),
        }
    }

    #[test]
    fn test_linear_delays() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_millis(1500));
        assert_eq!(policy.delay_after(2), Duration::from_millis(3000));
    }

    #[test]
    fn test_outcome_classification() {
        let policy = RetryPolicy::default();

        assert!(matches!(policy.outcome(1, Ok(7)), AttemptOutcome::Succeeded(7)));
        assert!(matches!(
            policy.outcome::<()>(1, Err(unavailable())),
            AttemptOutcome::Retry { delay, .. } if delay == Duration::from_millis(1500)
        ));
        assert!(matches!(
            policy.outcome::<()>(3, Err(unavailable())),
            AttemptOutcome::Exhausted(StorageError::Exhausted { attempts: 3, .. })
        ));
        assert!(matches!(
            policy.outcome::<()>(1, Err(StorageError::Validation("bad".into()))),
            AttemptOutcome::Failed(StorageError::Validation(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_waits_between_attempts() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result = RetryPolicy::default()
            .run("upload", |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err(unavailable())
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1.5s after the first failure, 3s after the second
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(4500), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(4600), "elapsed {:?}", elapsed);
    }

    #[test]
    fn test_single_attempt_policy_surfaces_error() {
        assert!(matches!(
            RetryPolicy::none().outcome::<()>(1, Err(unavailable())),
            AttemptOutcome::Failed(StorageError::Status { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_run_stops_on_permanent_error() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = RetryPolicy::default()
            .run("upload", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(StorageError::Validation("nope".into())) }
            })
            .await;

        assert!(matches!(result, Err(StorageError::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
