//! Request context carrying a deadline and a cancellation signal.
//!
//! Every processor receives a [`RequestContext`]. The bulkhead and the
//! fallback strategy derive child contexts with tighter deadlines; cancelling
//! a parent cancels all of its children.
//!
//! ## Example
//!
//! ```rust,ignore
//! use bulwark_core::RequestContext;
//! use std::time::Duration;
//!
//! let ctx = RequestContext::new().with_timeout(Duration::from_secs(2));
//!
//! // Hand the context to a processor; it can poll `ctx.is_cancelled()`
//! // or await `ctx.cancelled()` to stop early.
//! ```

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a context finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Done {
    /// The deadline passed.
    DeadlineExceeded,
    /// The context was cancelled.
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    deadline: Option<Instant>,
    token: CancellationToken,
}

impl RequestContext {
    /// A fresh context with no deadline.
    pub fn new() -> Self {
        Self {
            deadline: None,
            token: CancellationToken::new(),
        }
    }

    /// Build a context driven by an existing cancellation token.
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            deadline: None,
            token,
        }
    }

    /// Derive a child context whose deadline is the earlier of the parent's
    /// and `deadline`.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        };
        Self {
            deadline: Some(deadline),
            token: self.token.child_token(),
        }
    }

    /// Derive a child context that expires `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_timeout_from(Instant::now(), timeout)
    }

    /// Derive a child context that expires `timeout` after `start`.
    ///
    /// A timeout too large to represent as an instant adds no deadline; the
    /// child keeps the parent's.
    pub fn with_timeout_from(&self, start: Instant, timeout: Duration) -> Self {
        match start.checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.child(),
        }
    }

    /// Derive a child context sharing the parent's deadline.
    pub fn child(&self) -> Self {
        Self {
            deadline: self.deadline,
            token: self.token.child_token(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline. `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the context is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> Done {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => Done::Cancelled,
                    _ = tokio::time::sleep_until(deadline) => Done::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                Done::Cancelled
            }
        }
    }

    /// The underlying cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
