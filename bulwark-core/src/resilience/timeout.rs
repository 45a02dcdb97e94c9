//! Deadline enforcement shared by the bulkhead and the fallback strategy.
//!
//! A request may carry its own timeout; the component executing it has a
//! default. The effective timeout is the smaller of the two, and any deadline
//! already present on the caller's [`RequestContext`] caps it further.
//!
//! ## Example
//!
//! ```rust,ignore
//! use bulwark_core::resilience::{TimeoutPolicy, Guarded, guard};
//!
//! let policy = TimeoutPolicy::new(Duration::from_millis(100));
//! let child = policy.child_context(&ctx, request.timeout);
//!
//! match guard(&child, slow_operation()).await {
//!     Guarded::Completed(value) => value,
//!     Guarded::DeadlineExceeded => return Err(timeout_error()),
//!     Guarded::Cancelled => return Err(cancelled_error()),
//! }
//! ```

use crate::context::RequestContext;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Result of racing a future against a context.
#[derive(Debug)]
pub enum Guarded<T> {
    /// The future finished first.
    Completed(T),
    /// The context deadline passed first. The future has been dropped.
    DeadlineExceeded,
    /// The context was cancelled first. The future has been dropped.
    Cancelled,
}

/// Timeout policy for one pool or strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    default: Duration,
}

impl TimeoutPolicy {
    pub fn new(default: Duration) -> Self {
        Self { default }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default
    }

    /// min(request override, default).
    pub fn effective(&self, requested: Option<Duration>) -> Duration {
        match requested {
            Some(requested) => requested.min(self.default),
            None => self.default,
        }
    }

    /// Child of `ctx` expiring at `start + effective(requested)`.
    pub fn child_context_from(
        &self,
        ctx: &RequestContext,
        start: Instant,
        requested: Option<Duration>,
    ) -> RequestContext {
        ctx.with_timeout_from(start, self.effective(requested))
    }

    /// Child of `ctx` expiring `effective(requested)` from now.
    pub fn child_context(&self, ctx: &RequestContext, requested: Option<Duration>) -> RequestContext {
        self.child_context_from(ctx, Instant::now(), requested)
    }
}

/// Race `fut` against the deadline and cancellation of `ctx`.
///
/// Cancellation wins ties so that a cancelled caller is never reported as a
/// timeout.
pub async fn guard<Fut>(ctx: &RequestContext, fut: Fut) -> Guarded<Fut::Output>
where
    Fut: Future,
{
    let deadline = ctx.deadline();
    let sleep = async move {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        _ = ctx.cancelled() => Guarded::Cancelled,
        output = fut => Guarded::Completed(output),
        _ = sleep => Guarded::DeadlineExceeded,
    }
}
