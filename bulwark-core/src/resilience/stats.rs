//! Request statistics for bulkheads, pools and fallback strategies.

use crate::error::{ErrorKind, ResilienceError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Terminal outcome of one bulkhead request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Rejected,
    TimedOut,
    Cancelled,
    Failed,
}

impl Outcome {
    pub fn of<T>(result: &Result<T, ResilienceError>) -> Self {
        match result {
            Ok(_) => Self::Succeeded,
            Err(err) => match err.kind() {
                ErrorKind::PoolFull | ErrorKind::QueueTimeout => Self::Rejected,
                ErrorKind::Timeout => Self::TimedOut,
                ErrorKind::Cancelled => Self::Cancelled,
                _ => Self::Failed,
            },
        }
    }
}

/// Bulkhead statistics.
///
/// `failed_requests` is the sum of the four breakdown counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkheadStats {
    /// Total finished requests.
    pub total_requests: u64,
    /// Requests whose processor succeeded.
    pub successful_requests: u64,
    /// Requests that ended in any error.
    pub failed_requests: u64,
    /// Rejected by a full pool or timed out while queued.
    pub rejected_requests: u64,
    /// Deadline exceeded while executing.
    pub timed_out_requests: u64,
    /// Caller cancelled.
    pub cancelled_requests: u64,
    /// Processor returned an error or panicked.
    pub processor_errors: u64,
    /// Mean latency of finished requests, queue wait included.
    pub average_latency_ms: f64,
    #[serde(skip)]
    total_latency: Duration,
}

impl BulkheadStats {
    /// Fraction of finished requests that failed (0.0 - 1.0).
    pub fn failure_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.failed_requests as f64 / self.total_requests as f64
        }
    }

    fn record(&mut self, outcome: Outcome, latency: Duration) {
        self.total_requests += 1;
        match outcome {
            Outcome::Succeeded => self.successful_requests += 1,
            Outcome::Rejected => self.rejected_requests += 1,
            Outcome::TimedOut => self.timed_out_requests += 1,
            Outcome::Cancelled => self.cancelled_requests += 1,
            Outcome::Failed => self.processor_errors += 1,
        }
        if outcome != Outcome::Succeeded {
            self.failed_requests += 1;
        }
        self.total_latency += latency;
        self.average_latency_ms =
            self.total_latency.as_micros() as f64 / 1000.0 / self.total_requests as f64;
    }
}

/// Lock-guarded stats so that snapshots and resets never observe a
/// half-recorded request.
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    inner: Mutex<BulkheadStats>,
}

impl StatsRecorder {
    pub(crate) fn record(&self, outcome: Outcome, latency: Duration) {
        self.inner.lock().record(outcome, latency);
    }

    pub(crate) fn snapshot(&self) -> BulkheadStats {
        self.inner.lock().clone()
    }

    pub(crate) fn reset(&self) {
        *self.inner.lock() = BulkheadStats::default();
    }
}

/// Fallback strategy statistics.
///
/// Every finished request lands in exactly one of `primary_successes`,
/// `fallback_successes` or `failed_requests`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackStats {
    pub total_requests: u64,
    /// Answered by the primary, possibly after retries.
    pub primary_successes: u64,
    /// Answered by a handler.
    pub fallback_successes: u64,
    /// Surfaced an error to the caller.
    pub failed_requests: u64,
    /// `cached_response` handlers that found a fresh entry.
    pub cache_hits: u64,
    /// `cached_response` handlers that fell back to their default.
    pub cache_misses: u64,
    /// Primary attempts beyond the first.
    pub retries: u64,
}

impl FallbackStats {
    /// Fraction of finished requests answered by a handler (0.0 - 1.0).
    pub fn fallback_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.fallback_successes as f64 / self.total_requests as f64
        }
    }
}
