//! Bounded concurrency + queue + timeout unit for one downstream service.
//!
//! Admission happens in two steps. A request first reserves one of the
//! `max_concurrency + max_queue_size` places; when none is left it is
//! rejected on the spot. It then takes a concurrency permit, waiting in
//! FIFO order behind earlier arrivals when all permits are in use.

use crate::context::RequestContext;
use crate::error::{ResilienceError, Result};
use crate::resilience::stats::{BulkheadStats, StatsRecorder};
use crate::resilience::timeout::{Guarded, TimeoutPolicy, guard};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::Instant;
use tracing::debug;

/// Point-in-time view of a pool's limits and load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub service: String,
    pub max_concurrency: u32,
    pub max_queue_size: u32,
    #[serde(with = "crate::duration_ms")]
    pub timeout: Duration,
    pub in_flight: u32,
    pub queue_depth: u32,
    pub available_permits: u32,
}

impl PoolSnapshot {
    /// Calculate utilization (0.0 - 1.0).
    pub fn utilization(&self) -> f64 {
        self.in_flight as f64 / self.max_concurrency as f64
    }
}

pub struct Pool {
    service: String,
    max_concurrency: u32,
    max_queue_size: u32,
    timeout: TimeoutPolicy,
    semaphore: Semaphore,
    /// Running plus queued.
    occupancy: AtomicU32,
    in_flight: AtomicU32,
    queued: AtomicU32,
    stats: StatsRecorder,
}

impl Pool {
    pub(crate) fn new(
        service: impl Into<String>,
        max_concurrency: u32,
        max_queue_size: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let service = service.into();
        if service.is_empty() {
            return Err(ResilienceError::InvalidConfig(
                "pool service name cannot be empty".to_string(),
            ));
        }
        if max_concurrency == 0 {
            return Err(ResilienceError::InvalidConfig(format!(
                "pool '{}': max_concurrency must be at least 1",
                service
            )));
        }
        if timeout.is_zero() {
            return Err(ResilienceError::InvalidConfig(format!(
                "pool '{}': timeout must be greater than zero",
                service
            )));
        }

        Ok(Self {
            service,
            max_concurrency,
            max_queue_size,
            timeout: TimeoutPolicy::new(timeout),
            semaphore: Semaphore::new(max_concurrency as usize),
            occupancy: AtomicU32::new(0),
            in_flight: AtomicU32::new(0),
            queued: AtomicU32::new(0),
            stats: StatsRecorder::default(),
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn max_concurrency(&self) -> u32 {
        self.max_concurrency
    }

    pub fn max_queue_size(&self) -> u32 {
        self.max_queue_size
    }

    pub fn timeout(&self) -> Duration {
        self.timeout.default_timeout()
    }

    pub fn timeout_policy(&self) -> &TimeoutPolicy {
        &self.timeout
    }

    /// Requests currently executing.
    pub fn in_flight(&self) -> u32 {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Requests currently waiting for a permit.
    pub fn queue_depth(&self) -> u32 {
        self.queued.load(Ordering::SeqCst)
    }

    pub fn available_permits(&self) -> u32 {
        self.semaphore.available_permits() as u32
    }

    pub fn stats(&self) -> BulkheadStats {
        self.stats.snapshot()
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            service: self.service.clone(),
            max_concurrency: self.max_concurrency,
            max_queue_size: self.max_queue_size,
            timeout: self.timeout(),
            in_flight: self.in_flight(),
            queue_depth: self.queue_depth(),
            available_permits: self.available_permits(),
        }
    }

    pub(crate) fn recorder(&self) -> &StatsRecorder {
        &self.stats
    }

    /// Take a running slot, queueing if necessary.
    ///
    /// `ctx` must carry the request's effective deadline; it bounds the time
    /// spent in the queue.
    pub(crate) async fn acquire(&self, ctx: &RequestContext) -> Result<PoolPermit<'_>> {
        let reservation = self.reserve().ok_or_else(|| ResilienceError::PoolFull {
            service: self.service.clone(),
            max_concurrency: self.max_concurrency,
            max_queue_size: self.max_queue_size,
        })?;

        if let Ok(permit) = self.semaphore.try_acquire() {
            return Ok(PoolPermit::new(self, permit, reservation));
        }

        let waiting = QueueSlot::enter(&self.queued);
        let enqueued_at = Instant::now();
        debug!(
            service = %self.service,
            queue_depth = self.queue_depth(),
            "Pool at capacity, request queued"
        );

        match guard(ctx, self.semaphore.acquire()).await {
            Guarded::Completed(Ok(permit)) => {
                drop(waiting);
                Ok(PoolPermit::new(self, permit, reservation))
            }
            // The semaphore is never closed.
            Guarded::Completed(Err(_)) => Err(ResilienceError::PoolFull {
                service: self.service.clone(),
                max_concurrency: self.max_concurrency,
                max_queue_size: self.max_queue_size,
            }),
            Guarded::DeadlineExceeded => Err(ResilienceError::QueueTimeout {
                service: self.service.clone(),
                waited: enqueued_at.elapsed(),
            }),
            Guarded::Cancelled => Err(ResilienceError::Cancelled {
                service: self.service.clone(),
            }),
        }
    }

    fn reserve(&self) -> Option<Reservation<'_>> {
        let limit = self.max_concurrency.saturating_add(self.max_queue_size);
        self.occupancy
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < limit).then_some(n + 1)
            })
            .ok()
            .map(|_| Reservation(&self.occupancy))
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("service", &self.service)
            .field("max_concurrency", &self.max_concurrency)
            .field("max_queue_size", &self.max_queue_size)
            .field("timeout", &self.timeout())
            .field("in_flight", &self.in_flight())
            .field("queue_depth", &self.queue_depth())
            .finish()
    }
}

/// One of the running+queued places.
struct Reservation<'a>(&'a AtomicU32);

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

struct QueueSlot<'a>(&'a AtomicU32);

impl<'a> QueueSlot<'a> {
    fn enter(counter: &'a AtomicU32) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for QueueSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A held running slot. Released on drop, whatever the exit path.
pub(crate) struct PoolPermit<'a> {
    in_flight: &'a AtomicU32,
    // Field order matters: the permit goes back before the reservation so
    // the queue bound holds while a slot changes hands.
    _permit: SemaphorePermit<'a>,
    _reservation: Reservation<'a>,
}

impl<'a> PoolPermit<'a> {
    fn new(pool: &'a Pool, permit: SemaphorePermit<'a>, reservation: Reservation<'a>) -> Self {
        pool.in_flight.fetch_add(1, Ordering::SeqCst);
        Self {
            in_flight: &pool.in_flight,
            _permit: permit,
            _reservation: reservation,
        }
    }
}

impl Drop for PoolPermit<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
