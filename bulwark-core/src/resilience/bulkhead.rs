//! Bulkhead pattern for resource isolation.
//!
//! A bulkhead owns one [`Pool`] per downstream service and runs caller
//! supplied work inside that pool's limits, so that a slow compliance API
//! cannot starve the ML scoring calls sharing the process.
//!
//! ## Example
//!
//! ```rust,ignore
//! use bulwark_core::resilience::{Bulkhead, BulkheadConfig, BulkheadRequest, BulkheadResponse};
//! use bulwark_core::RequestContext;
//!
//! let bulkhead = Bulkhead::new("risk-api", BulkheadConfig::default())?;
//! bulkhead.create_pool("sanctions-screening", 4, 16, Duration::from_secs(2))?;
//!
//! let request = BulkheadRequest::new("sanctions-screening", "screen", json!({"entity": 42}));
//! let response = bulkhead
//!     .execute(&RequestContext::new(), request, |ctx, req| async move {
//!         let hits = screening_client.screen(&ctx, &req.data).await?;
//!         Ok(BulkheadResponse::success(req.id, hits))
//!     })
//!     .await?;
//! ```

use crate::context::RequestContext;
use crate::error::{BoxError, ResilienceError, Result};
use crate::resilience::pool::{Pool, PoolSnapshot};
use crate::resilience::stats::{BulkheadStats, Outcome, StatsRecorder};
use crate::resilience::timeout::{Guarded, guard};
use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Bulkhead configuration.
///
/// The defaults apply to pools created lazily for services that were never
/// registered through [`Bulkhead::create_pool`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkheadConfig {
    /// Maximum concurrent executions per pool.
    pub default_max_concurrency: u32,
    /// Maximum requests waiting per pool.
    pub default_max_queue_size: u32,
    /// Upper bound on a request's lifetime, queue wait included.
    #[serde(rename = "default_timeout_ms", with = "crate::duration_ms")]
    pub default_timeout: Duration,
    /// Record request statistics.
    pub enable_metrics: bool,
    /// Emit tracing events.
    pub enable_logging: bool,
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        Self {
            default_max_concurrency: 10,
            default_max_queue_size: 100,
            default_timeout: Duration::from_secs(30),
            enable_metrics: true,
            enable_logging: true,
        }
    }
}

impl BulkheadConfig {
    /// Create a new configuration.
    pub fn new(max_concurrency: u32, max_queue_size: u32) -> Self {
        Self {
            default_max_concurrency: max_concurrency,
            default_max_queue_size: max_queue_size,
            ..Default::default()
        }
    }

    /// Set the default timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Enable or disable statistics.
    pub fn metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = enable;
        self
    }

    /// Enable or disable logging.
    pub fn logging(mut self, enable: bool) -> Self {
        self.enable_logging = enable;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_max_concurrency == 0 {
            return Err(ResilienceError::InvalidConfig(
                "default_max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.default_timeout.is_zero() {
            return Err(ResilienceError::InvalidConfig(
                "default_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// A unit of work submitted to a bulkhead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkheadRequest {
    pub id: String,
    /// Pool key.
    pub service: String,
    pub operation: String,
    pub data: Value,
    /// Overrides the pool timeout when shorter.
    #[serde(rename = "timeout_ms", with = "crate::duration_ms::option", default)]
    pub timeout: Option<Duration>,
    /// Advisory only; admission is FIFO.
    #[serde(default)]
    pub priority: i32,
    pub created_at: DateTime<Utc>,
}

impl BulkheadRequest {
    pub fn new(service: impl Into<String>, operation: impl Into<String>, data: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            service: service.into(),
            operation: operation.into(),
            data,
            timeout: None,
            priority: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// Result of a processor run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkheadResponse {
    pub id: String,
    pub success: bool,
    pub result: Value,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "latency_ms", with = "crate::duration_ms::option", default)]
    pub latency: Option<Duration>,
    #[serde(default)]
    pub error: Option<String>,
}

impl BulkheadResponse {
    pub fn success(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            success: true,
            result,
            created_at: Utc::now(),
            latency: None,
            error: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

/// Concurrency and queue isolation for a set of named services.
pub struct Bulkhead {
    name: String,
    config: BulkheadConfig,
    pools: RwLock<HashMap<String, Arc<Pool>>>,
    stats: StatsRecorder,
    /// Held shared while a request is recorded and exclusively while stats
    /// are reset, so the aggregate and per-pool views are zeroed together.
    stats_gate: RwLock<()>,
}

impl Bulkhead {
    /// Create a new bulkhead.
    pub fn new(name: impl Into<String>, config: BulkheadConfig) -> Result<Arc<Self>> {
        config.validate()?;
        let name = name.into();

        if config.enable_logging {
            info!(
                name = %name,
                max_concurrency = config.default_max_concurrency,
                max_queue_size = config.default_max_queue_size,
                timeout = ?config.default_timeout,
                "Bulkhead initialized"
            );
        }

        Ok(Arc::new(Self {
            name,
            config,
            pools: RwLock::new(HashMap::new()),
            stats: StatsRecorder::default(),
            stats_gate: RwLock::new(()),
        }))
    }

    /// Get the bulkhead name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &BulkheadConfig {
        &self.config
    }

    /// Register or replace the pool for `service`.
    ///
    /// Requests already running against a replaced pool finish against it.
    pub fn create_pool(
        &self,
        service: impl Into<String>,
        max_concurrency: u32,
        max_queue_size: u32,
        timeout: Duration,
    ) -> Result<()> {
        let pool = Pool::new(service, max_concurrency, max_queue_size, timeout)?;

        if self.config.enable_logging {
            debug!(
                bulkhead = %self.name,
                service = %pool.service(),
                max_concurrency,
                max_queue_size,
                timeout = ?timeout,
                "Pool registered"
            );
        }

        self.pools
            .write()
            .insert(pool.service().to_string(), Arc::new(pool));
        Ok(())
    }

    /// Services with a pool, sorted.
    pub fn services(&self) -> Vec<String> {
        let mut services: Vec<String> = self.pools.read().keys().cloned().collect();
        services.sort();
        services
    }

    /// Limits and live load of a service's pool.
    pub fn pool_snapshot(&self, service: &str) -> Option<PoolSnapshot> {
        self.pools.read().get(service).map(|p| p.snapshot())
    }

    /// Statistics of a single service's pool.
    pub fn pool_stats(&self, service: &str) -> Option<BulkheadStats> {
        self.pools.read().get(service).map(|p| p.stats())
    }

    /// Aggregate statistics across all pools.
    pub fn get_stats(&self) -> BulkheadStats {
        self.stats.snapshot()
    }

    /// Zero the aggregate and per-pool statistics.
    pub fn reset_stats(&self) {
        let _gate = self.stats_gate.write();
        self.stats.reset();
        for pool in self.pools.read().values() {
            pool.recorder().reset();
        }
    }

    /// Run `processor` for `request` inside the limits of its service pool.
    ///
    /// The processor receives a child of `ctx` carrying the effective
    /// deadline. On timeout the processor future is dropped and that child
    /// context cancelled. The processor's response is returned unchanged.
    pub async fn execute<F, Fut>(
        &self,
        ctx: &RequestContext,
        request: BulkheadRequest,
        processor: F,
    ) -> Result<BulkheadResponse>
    where
        F: FnOnce(RequestContext, BulkheadRequest) -> Fut,
        Fut: Future<Output = std::result::Result<BulkheadResponse, BoxError>>,
    {
        let pool = self.pool_for(&request.service)?;
        let started = Instant::now();
        let request_id = request.id.clone();

        let result = self.run(&pool, ctx, started, request, processor).await;

        let latency = started.elapsed();
        if self.config.enable_metrics {
            let outcome = Outcome::of(&result);
            let _gate = self.stats_gate.read();
            pool.recorder().record(outcome, latency);
            self.stats.record(outcome, latency);
        }
        if self.config.enable_logging
            && let Err(err) = &result
        {
            if err.is_rejection() {
                debug!(
                    bulkhead = %self.name,
                    service = %pool.service(),
                    request_id = %request_id,
                    error = %err,
                    "Request rejected"
                );
            } else {
                warn!(
                    bulkhead = %self.name,
                    service = %pool.service(),
                    request_id = %request_id,
                    latency = ?latency,
                    error = %err,
                    "Request failed"
                );
            }
        }

        result
    }

    async fn run<F, Fut>(
        &self,
        pool: &Pool,
        ctx: &RequestContext,
        started: Instant,
        request: BulkheadRequest,
        processor: F,
    ) -> Result<BulkheadResponse>
    where
        F: FnOnce(RequestContext, BulkheadRequest) -> Fut,
        Fut: Future<Output = std::result::Result<BulkheadResponse, BoxError>>,
    {
        let effective = pool.timeout_policy().effective(request.timeout);
        let child = pool
            .timeout_policy()
            .child_context_from(ctx, started, request.timeout);

        let _permit = pool.acquire(&child).await?;

        let panicked = || ResilienceError::processor(pool.service(), "processor panicked");
        let work = std::panic::catch_unwind(AssertUnwindSafe(|| {
            processor(child.clone(), request)
        }))
        .map_err(|_| panicked())?;

        match guard(&child, AssertUnwindSafe(work).catch_unwind()).await {
            Guarded::Completed(Ok(Ok(response))) => Ok(response),
            Guarded::Completed(Ok(Err(source))) => Err(ResilienceError::Processor {
                service: pool.service().to_string(),
                source,
            }),
            Guarded::Completed(Err(_panic)) => Err(panicked()),
            Guarded::DeadlineExceeded => {
                child.cancel();
                Err(ResilienceError::Timeout {
                    service: pool.service().to_string(),
                    timeout: effective,
                })
            }
            Guarded::Cancelled => Err(ResilienceError::Cancelled {
                service: pool.service().to_string(),
            }),
        }
    }

    /// The pool for `service`, created from the defaults on first use.
    fn pool_for(&self, service: &str) -> Result<Arc<Pool>> {
        if let Some(pool) = self.pools.read().get(service) {
            return Ok(Arc::clone(pool));
        }

        let mut pools = self.pools.write();
        if let Some(pool) = pools.get(service) {
            return Ok(Arc::clone(pool));
        }
        let pool = Arc::new(Pool::new(
            service,
            self.config.default_max_concurrency,
            self.config.default_max_queue_size,
            self.config.default_timeout,
        )?);
        pools.insert(service.to_string(), Arc::clone(&pool));
        Ok(pool)
    }
}

impl std::fmt::Debug for Bulkhead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bulkhead")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("services", &self.services())
            .finish()
    }
}
