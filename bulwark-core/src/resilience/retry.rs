//! Retry policy applied to primary calls before a fallback is consulted.
//!
//! ## Example
//!
//! ```rust,ignore
//! use bulwark_core::resilience::{RetryPolicy, BackoffStrategy};
//! use std::time::Duration;
//!
//! let retry = RetryPolicy::new(2, BackoffStrategy::exponential(Duration::from_millis(50)));
//!
//! let attempted = retry
//!     .call(&ctx, |attempt| async move { compliance_api.check(attempt).await })
//!     .await;
//! ```

use crate::context::RequestContext;
use crate::error::ResilienceError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff strategy for retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// No delay between retries.
    None,
    /// Constant delay between retries.
    Constant {
        #[serde(rename = "delay_ms", with = "crate::duration_ms")]
        delay: Duration,
    },
    /// Linear backoff: delay increases by a fixed amount.
    Linear {
        #[serde(rename = "initial_ms", with = "crate::duration_ms")]
        initial: Duration,
        #[serde(rename = "increment_ms", with = "crate::duration_ms")]
        increment: Duration,
        #[serde(rename = "max_ms", with = "crate::duration_ms")]
        max: Duration,
    },
    /// Exponential backoff: delay multiplies each retry.
    Exponential {
        #[serde(rename = "initial_ms", with = "crate::duration_ms")]
        initial: Duration,
        multiplier: f64,
        #[serde(rename = "max_ms", with = "crate::duration_ms")]
        max: Duration,
        /// Add up to 50% random jitter.
        #[serde(default)]
        jitter: bool,
    },
}

impl BackoffStrategy {
    /// Create constant backoff.
    pub fn constant(delay: Duration) -> Self {
        Self::Constant { delay }
    }

    /// Create linear backoff.
    pub fn linear(initial: Duration, increment: Duration) -> Self {
        Self::Linear {
            initial,
            increment,
            max: Duration::from_secs(60),
        }
    }

    /// Create exponential backoff.
    pub fn exponential(initial: Duration) -> Self {
        Self::Exponential {
            initial,
            multiplier: 2.0,
            max: Duration::from_secs(60),
            jitter: false,
        }
    }

    /// Create exponential backoff with jitter.
    pub fn exponential_with_jitter(initial: Duration) -> Self {
        Self::Exponential {
            initial,
            multiplier: 2.0,
            max: Duration::from_secs(60),
            jitter: true,
        }
    }

    /// Set maximum delay.
    pub fn with_max(self, max: Duration) -> Self {
        match self {
            Self::Linear {
                initial, increment, ..
            } => Self::Linear {
                initial,
                increment,
                max,
            },
            Self::Exponential {
                initial,
                multiplier,
                jitter,
                ..
            } => Self::Exponential {
                initial,
                multiplier,
                max,
                jitter,
            },
            other => other,
        }
    }

    /// Calculate delay before retry number `retry` (0-indexed).
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Constant { delay } => *delay,
            Self::Linear {
                initial,
                increment,
                max,
            } => initial.saturating_add(increment.saturating_mul(retry)).min(*max),
            Self::Exponential {
                initial,
                multiplier,
                max,
                jitter,
            } => {
                let factor = multiplier.powi(retry.min(i32::MAX as u32) as i32);
                let base_millis = (initial.as_millis() as f64 * factor).min(max.as_millis() as f64);
                let millis = if *jitter {
                    base_millis + base_millis * rand_factor() * 0.5
                } else {
                    base_millis
                };
                Duration::from_millis(millis as u64).min(*max)
            }
        }
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::constant(Duration::from_millis(100))
    }
}

/// Pseudo-random factor between 0.0 and 1.0.
fn rand_factor() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}

/// A value together with the number of attempts it took.
#[derive(Debug)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
}

/// Retry error.
#[derive(Debug)]
pub struct RetryError<E> {
    /// Last error encountered.
    pub last_error: E,
    /// Number of attempts made.
    pub attempts: u32,
}

impl<E: std::fmt::Display> std::fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Failed after {} attempts: {}",
            self.attempts, self.last_error
        )
    }
}

impl<E: std::fmt::Debug + std::fmt::Display> std::error::Error for RetryError<E> {}

/// Retry executor.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: BackoffStrategy,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: BackoffStrategy) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Single attempt, never retried.
    pub fn none() -> Self {
        Self::new(0, BackoffStrategy::None)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Initial attempt plus retries.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn backoff(&self) -> &BackoffStrategy {
        &self.backoff
    }

    /// Cancellation and bad configuration are final.
    pub fn should_retry(error: &ResilienceError) -> bool {
        error.is_retriable()
    }

    /// Run `f` until it succeeds, fails with a final error, or attempts run
    /// out. `f` receives the 1-based attempt number.
    ///
    /// Waiting between attempts stops early when `ctx` is cancelled or
    /// expires; the last error is returned then.
    pub async fn call<F, Fut, T>(
        &self,
        ctx: &RequestContext,
        mut f: F,
    ) -> Result<Attempted<T>, RetryError<ResilienceError>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ResilienceError>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 1;

        loop {
            let last_error = match f(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Retry succeeded");
                    }
                    return Ok(Attempted {
                        value,
                        attempts: attempt,
                    });
                }
                Err(e) => e,
            };

            if attempt >= max_attempts || !Self::should_retry(&last_error) {
                if attempt > 1 {
                    warn!(
                        attempt,
                        max_attempts,
                        error = %last_error,
                        "Final retry attempt failed"
                    );
                }
                return Err(RetryError {
                    last_error,
                    attempts: attempt,
                });
            }

            let delay = self.backoff.delay_for_attempt(attempt - 1);
            debug!(
                attempt,
                delay = ?delay,
                error = %last_error,
                "Attempt failed, waiting before retry"
            );

            if ctx.is_cancelled() || ctx.is_expired() || !self.wait(ctx, delay).await {
                return Err(RetryError {
                    last_error,
                    attempts: attempt,
                });
            }

            attempt += 1;
        }
    }

    /// Sleep for `delay`. `false` when the context finished first.
    async fn wait(&self, ctx: &RequestContext, delay: Duration) -> bool {
        if delay.is_zero() {
            return true;
        }
        // The child finishes at the earlier of the delay and the parent's
        // deadline, or on cancellation.
        ctx.with_timeout(delay).done().await;
        !ctx.is_cancelled() && !ctx.is_expired()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn failure() -> ResilienceError {
        ResilienceError::processor("svc", "always fails")
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_on_first_try() {
        let retry = RetryPolicy::new(3, BackoffStrategy::None);

        let result = retry
            .call(&RequestContext::new(), |_| async { Ok::<_, ResilienceError>(42) })
            .await
            .unwrap();

        assert_eq!(result.value, 42);
        assert_eq!(result.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_on_second_try() {
        let attempts = AtomicU32::new(0);
        let retry = RetryPolicy::new(2, BackoffStrategy::constant(Duration::from_millis(10)));

        let result = retry
            .call(&RequestContext::new(), |_| {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        Err(failure())
                    } else {
                        Ok(42)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result.value, 42);
        assert_eq!(result.attempts, 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausted() {
        let retry = RetryPolicy::new(2, BackoffStrategy::None);

        let err = retry
            .call(&RequestContext::new(), |_| async { Err::<i32, _>(failure()) })
            .await
            .unwrap_err();

        assert_eq!(err.attempts, 3);
        assert!(err.to_string().contains("Failed after 3 attempts"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_is_not_retried() {
        let calls = AtomicU32::new(0);
        let retry = RetryPolicy::new(5, BackoffStrategy::None);

        let err = retry
            .call(&RequestContext::new(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err::<i32, _>(ResilienceError::Cancelled {
                        service: "svc".to_string(),
                    })
                }
            })
            .await
            .unwrap_err();

        assert_eq!(err.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_stops_at_context_deadline() {
        let ctx = RequestContext::new().with_timeout(Duration::from_millis(30));
        let retry = RetryPolicy::new(10, BackoffStrategy::constant(Duration::from_secs(1)));

        let err = retry
            .call(&ctx, |_| async { Err::<i32, _>(failure()) })
            .await
            .unwrap_err();

        assert_eq!(err.attempts, 1);
    }

    #[test]
    fn test_exponential_backoff() {
        let backoff = BackoffStrategy::exponential(Duration::from_millis(100));

        assert_eq!(backoff.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_millis(400));
    }

    #[test]
    fn test_linear_backoff_capped() {
        let backoff = BackoffStrategy::linear(Duration::from_millis(100), Duration::from_millis(50))
            .with_max(Duration::from_millis(180));

        assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(150));
        assert_eq!(backoff.delay_for_attempt(4), Duration::from_millis(180));
    }

    #[test]
    fn test_backoff_serde() {
        let backoff: BackoffStrategy =
            serde_json::from_str(r#"{"kind": "constant", "delay_ms": 250}"#).unwrap();
        assert_eq!(backoff, BackoffStrategy::constant(Duration::from_millis(250)));
    }
}
