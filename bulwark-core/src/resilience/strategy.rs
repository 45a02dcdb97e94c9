//! Fallback strategy: run a primary call and degrade gracefully when it fails.
//!
//! ## Example
//!
//! ```rust,ignore
//! use bulwark_core::resilience::{FallbackStrategy, FallbackConfig, FallbackHandler, FallbackKind};
//!
//! let strategy = FallbackStrategy::new("risk-scoring", FallbackConfig::default())?;
//! strategy.register_fallback(FallbackHandler::new(
//!     "kyc-cache",
//!     "kyc",
//!     FallbackKind::CachedResponse { default: json!({"status": "unknown"}) },
//! ))?;
//!
//! let response = strategy
//!     .execute_with_fallback(&ctx, request, |ctx, req| async move {
//!         let result = kyc_client.lookup(&ctx, &req.data).await?;
//!         Ok(FallbackResponse::success(req.id, result))
//!     })
//!     .await?;
//!
//! if response.fallback_used {
//!     tracing::warn!("served degraded KYC result");
//! }
//! ```

use crate::context::RequestContext;
use crate::error::{BoxError, ResilienceError, Result};
use crate::resilience::cache::ResponseCache;
use crate::resilience::fallback::{
    FallbackConfig, FallbackHandler, FallbackKind, FallbackRequest, FallbackResponse,
};
use crate::resilience::retry::{Attempted, RetryError, RetryPolicy};
use crate::resilience::stats::FallbackStats;
use crate::resilience::timeout::{Guarded, TimeoutPolicy, guard};
use futures_util::FutureExt;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Primary execution with per-service fallback handlers.
pub struct FallbackStrategy {
    name: String,
    config: FallbackConfig,
    retry: RetryPolicy,
    handlers: RwLock<HashMap<String, FallbackHandler>>,
    cache: ResponseCache,
    stats: Mutex<FallbackStats>,
}

impl FallbackStrategy {
    /// Create a new fallback strategy.
    pub fn new(name: impl Into<String>, config: FallbackConfig) -> Result<Arc<Self>> {
        config.validate()?;
        let name = name.into();

        if config.enable_logging {
            info!(
                name = %name,
                timeout = ?config.default_timeout,
                caching = config.enable_caching,
                max_retries = config.max_retries,
                "Fallback strategy initialized"
            );
        }

        Ok(Arc::new(Self {
            name,
            retry: RetryPolicy::new(config.max_retries, config.effective_backoff()),
            cache: ResponseCache::new(config.cache_capacity),
            config,
            handlers: RwLock::new(HashMap::new()),
            stats: Mutex::new(FallbackStats::default()),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &FallbackConfig {
        &self.config
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Register the handler for `handler.service`, replacing any previous one.
    pub fn register_fallback(&self, handler: FallbackHandler) -> Result<()> {
        handler.validate()?;

        if self.config.enable_logging {
            info!(
                strategy = %self.name,
                handler = %handler.name,
                service = %handler.service,
                fallback_type = %handler.fallback_type(),
                enabled = handler.enabled,
                "Fallback handler registered"
            );
        }

        self.handlers
            .write()
            .insert(handler.service.clone(), handler);
        Ok(())
    }

    /// Remove and return the handler for `service`.
    pub fn unregister_fallback(&self, service: &str) -> Result<FallbackHandler> {
        let removed = self.handlers.write().remove(service);
        match removed {
            Some(handler) => {
                if self.config.enable_logging {
                    debug!(
                        strategy = %self.name,
                        service,
                        handler = %handler.name,
                        "Fallback handler removed"
                    );
                }
                Ok(handler)
            }
            None => Err(ResilienceError::FallbackNotRegistered {
                service: service.to_string(),
            }),
        }
    }

    /// The handler registered for `service`.
    pub fn handler(&self, service: &str) -> Option<FallbackHandler> {
        self.handlers.read().get(service).cloned()
    }

    /// All handlers, sorted by service.
    pub fn handlers(&self) -> Vec<FallbackHandler> {
        let mut handlers: Vec<FallbackHandler> = self.handlers.read().values().cloned().collect();
        handlers.sort_by(|a, b| a.service.cmp(&b.service));
        handlers
    }

    /// Switch the handler for `service` on or off.
    pub fn set_enabled(&self, service: &str, enabled: bool) -> Result<()> {
        let mut handlers = self.handlers.write();
        let handler =
            handlers
                .get_mut(service)
                .ok_or_else(|| ResilienceError::FallbackNotRegistered {
                    service: service.to_string(),
                })?;
        handler.enabled = enabled;

        if self.config.enable_logging {
            info!(strategy = %self.name, service, enabled, "Fallback handler toggled");
        }
        Ok(())
    }

    /// Run `primary`, retrying per the configured policy, and degrade through
    /// the service's handler if every attempt fails.
    ///
    /// `primary` may be called several times and each attempt gets its own
    /// child context bounded by min(request timeout, handler timeout,
    /// configured default timeout). Caller cancellation is returned as is and
    /// never degraded.
    pub async fn execute_with_fallback<F, Fut>(
        &self,
        ctx: &RequestContext,
        request: FallbackRequest,
        primary: F,
    ) -> Result<FallbackResponse>
    where
        F: Fn(RequestContext, FallbackRequest) -> Fut,
        Fut: Future<Output = std::result::Result<FallbackResponse, BoxError>>,
    {
        let started = Instant::now();
        let handler = self.handler(&request.service);
        let attempt_timeout = self.attempt_timeout(&request, handler.as_ref());

        let attempted = self
            .retry
            .call(ctx, |attempt| {
                if attempt > 1 && self.config.enable_logging {
                    debug!(
                        strategy = %self.name,
                        service = %request.service,
                        request_id = %request.id,
                        attempt,
                        "Retrying primary"
                    );
                }
                let child = ctx.with_timeout(attempt_timeout);
                let launched = std::panic::catch_unwind(AssertUnwindSafe(|| {
                    primary(child.clone(), request.clone())
                }));
                let service = request.service.clone();
                async move {
                    let Ok(work) = launched else {
                        return Err(ResilienceError::processor(service, "primary panicked"));
                    };
                    match guard(&child, AssertUnwindSafe(work).catch_unwind()).await {
                        Guarded::Completed(Ok(Ok(response))) => Ok(response),
                        Guarded::Completed(Ok(Err(source))) => {
                            Err(ResilienceError::Processor { service, source })
                        }
                        Guarded::Completed(Err(_panic)) => {
                            Err(ResilienceError::processor(service, "primary panicked"))
                        }
                        Guarded::DeadlineExceeded => {
                            child.cancel();
                            Err(ResilienceError::Timeout {
                                service,
                                timeout: attempt_timeout,
                            })
                        }
                        Guarded::Cancelled => Err(ResilienceError::Cancelled { service }),
                    }
                }
            })
            .await;

        let result = match attempted {
            Ok(Attempted {
                value: response,
                attempts,
            }) => {
                self.record(|stats| {
                    stats.retries += u64::from(attempts - 1);
                    stats.primary_successes += 1;
                });
                self.store(&request, handler.as_ref(), &response);
                Ok(FallbackResponse {
                    fallback_used: false,
                    fallback_type: None,
                    from_cache: false,
                    latency: Some(response.latency.unwrap_or_else(|| started.elapsed())),
                    ..response
                })
            }
            Err(RetryError {
                last_error,
                attempts,
            }) => {
                self.record(|stats| stats.retries += u64::from(attempts - 1));
                if self.config.enable_logging {
                    warn!(
                        strategy = %self.name,
                        service = %request.service,
                        request_id = %request.id,
                        attempts,
                        error = %last_error,
                        "Primary failed"
                    );
                }
                if matches!(last_error, ResilienceError::Cancelled { .. }) {
                    self.record(|stats| stats.failed_requests += 1);
                    Err(last_error)
                } else {
                    self.degrade(&request, handler.as_ref(), last_error)
                        .map(|response| FallbackResponse {
                            latency: Some(started.elapsed()),
                            ..response
                        })
                }
            }
        };

        self.record(|stats| stats.total_requests += 1);
        result
    }

    /// Run the degradation path for `request` directly, as if its primary had
    /// failed with `primary_error`.
    pub fn invoke_fallback(
        &self,
        request: &FallbackRequest,
        primary_error: ResilienceError,
    ) -> Result<FallbackResponse> {
        let handler = self.handler(&request.service).ok_or_else(|| {
            ResilienceError::FallbackNotRegistered {
                service: request.service.clone(),
            }
        })?;

        let result = self.degrade(request, Some(&handler), primary_error);
        self.record(|stats| stats.total_requests += 1);
        result
    }

    /// Drop expired cache entries, returning how many were removed.
    pub fn purge_expired_cache(&self) -> usize {
        self.cache.purge_expired()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn get_stats(&self) -> FallbackStats {
        self.stats.lock().clone()
    }

    pub fn reset_stats(&self) {
        *self.stats.lock() = FallbackStats::default();
    }

    fn attempt_timeout(&self, request: &FallbackRequest, handler: Option<&FallbackHandler>) -> Duration {
        let requested = match (request.timeout, handler.and_then(|h| h.timeout)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        TimeoutPolicy::new(self.config.default_timeout).effective(requested)
    }

    /// Build the substitute response, or surface the failure.
    fn degrade(
        &self,
        request: &FallbackRequest,
        handler: Option<&FallbackHandler>,
        primary_error: ResilienceError,
    ) -> Result<FallbackResponse> {
        let Some(handler) = handler else {
            self.record(|stats| stats.failed_requests += 1);
            return Err(primary_error);
        };

        if !handler.enabled {
            self.record(|stats| stats.failed_requests += 1);
            if self.config.enable_logging {
                debug!(
                    strategy = %self.name,
                    service = %request.service,
                    handler = %handler.name,
                    "Fallback handler disabled"
                );
            }
            return Err(ResilienceError::FallbackDisabled {
                service: request.service.clone(),
                source: Box::new(primary_error),
            });
        }

        let (result, from_cache) = match &handler.kind {
            FallbackKind::CachedResponse { default } => {
                let cached = if self.cache_lookup_enabled(handler) {
                    self.cache.get(&request.service, &request.request_key())
                } else {
                    None
                };
                match cached {
                    Some(value) => {
                        self.record(|stats| stats.cache_hits += 1);
                        (value, true)
                    }
                    None => {
                        self.record(|stats| stats.cache_misses += 1);
                        (default.clone(), false)
                    }
                }
            }
            kind => (kind.substitute(), false),
        };

        if self.config.enable_logging {
            info!(
                strategy = %self.name,
                service = %request.service,
                request_id = %request.id,
                handler = %handler.name,
                fallback_type = %handler.fallback_type(),
                from_cache,
                "Fallback used"
            );
        }
        self.record(|stats| stats.fallback_successes += 1);

        Ok(FallbackResponse::degraded(
            request.id.clone(),
            result,
            handler.fallback_type(),
            from_cache,
            primary_error.to_string(),
        ))
    }

    fn cache_lookup_enabled(&self, handler: &FallbackHandler) -> bool {
        self.config.enable_caching && handler.cache_enabled
    }

    /// Cache a successful primary result. Responses reporting
    /// `success == false` are never cached.
    fn store(
        &self,
        request: &FallbackRequest,
        handler: Option<&FallbackHandler>,
        response: &FallbackResponse,
    ) {
        if !response.success
            || !self.config.enable_caching
            || handler.is_some_and(|h| !h.cache_enabled)
        {
            return;
        }
        let ttl = handler
            .and_then(|h| h.cache_ttl)
            .unwrap_or(self.config.cache_ttl);
        self.cache.insert(
            &request.service,
            &request.request_key(),
            response.result.clone(),
            ttl,
        );
    }

    fn record(&self, update: impl FnOnce(&mut FallbackStats)) {
        if self.config.enable_metrics {
            update(&mut self.stats.lock());
        }
    }
}

impl std::fmt::Debug for FallbackStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackStrategy")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("handlers", &self.handlers.read().len())
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::fallback::FallbackType;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicU32, Ordering};

    type PrimaryResult = std::result::Result<FallbackResponse, BoxError>;

    fn request() -> FallbackRequest {
        FallbackRequest::new("kyc", "lookup", json!({"entity": 7}))
    }

    async fn failing(_ctx: RequestContext, _req: FallbackRequest) -> PrimaryResult {
        Err("upstream 503".into())
    }

    async fn succeeding(_ctx: RequestContext, req: FallbackRequest) -> PrimaryResult {
        Ok(FallbackResponse::success(req.id, json!({"status": "clear"})))
    }

    fn strategy() -> Arc<FallbackStrategy> {
        FallbackStrategy::new("test", FallbackConfig::default()).unwrap()
    }

    fn cached_handler() -> FallbackHandler {
        FallbackHandler::new(
            "kyc-cache",
            "kyc",
            FallbackKind::CachedResponse {
                default: json!({"status": "unknown"}),
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_primary_success_skips_fallback() {
        let strategy = strategy();
        strategy.register_fallback(cached_handler()).unwrap();

        let response = strategy
            .execute_with_fallback(&RequestContext::new(), request(), succeeding)
            .await
            .unwrap();

        assert!(response.success);
        assert!(!response.fallback_used);
        assert_eq!(response.fallback_type, None);
        let stats = strategy.get_stats();
        assert_eq!(stats.primary_successes, 1);
        assert_eq!(stats.total_requests, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_response_default_when_cache_empty() {
        let strategy = strategy();
        strategy.register_fallback(cached_handler()).unwrap();

        let response = strategy
            .execute_with_fallback(&RequestContext::new(), request(), failing)
            .await
            .unwrap();

        assert!(response.success);
        assert!(response.fallback_used);
        assert!(!response.from_cache);
        assert_eq!(response.fallback_type, Some(FallbackType::CachedResponse));
        assert_eq!(response.result, json!({"status": "unknown"}));
        assert!(response.error.unwrap().contains("upstream 503"));
        assert_eq!(strategy.get_stats().cache_misses, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_value_served_then_expires() {
        let strategy = FallbackStrategy::new(
            "test",
            FallbackConfig::default().caching(true, Duration::from_secs(60)),
        )
        .unwrap();
        strategy.register_fallback(cached_handler()).unwrap();
        let ctx = RequestContext::new();

        strategy
            .execute_with_fallback(&ctx, request(), succeeding)
            .await
            .unwrap();
        assert_eq!(strategy.cache_len(), 1);

        let cached = strategy
            .execute_with_fallback(&ctx, request(), failing)
            .await
            .unwrap();
        assert!(cached.from_cache);
        assert_eq!(cached.result, json!({"status": "clear"}));

        tokio::time::advance(Duration::from_secs(61)).await;

        let expired = strategy
            .execute_with_fallback(&ctx, request(), failing)
            .await
            .unwrap();
        assert!(!expired.from_cache);
        assert_eq!(expired.result, json!({"status": "unknown"}));

        let stats = strategy.get_stats();
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsuccessful_primary_result_not_cached() {
        let strategy = strategy();
        strategy.register_fallback(cached_handler()).unwrap();
        let ctx = RequestContext::new();

        let reported = strategy
            .execute_with_fallback(&ctx, request(), |_ctx, req| async move {
                Ok::<_, BoxError>(FallbackResponse {
                    success: false,
                    ..FallbackResponse::success(req.id, json!("rejected by provider"))
                })
            })
            .await
            .unwrap();
        assert!(!reported.success);
        assert!(!reported.fallback_used);
        assert_eq!(strategy.cache_len(), 0);

        let degraded = strategy
            .execute_with_fallback(&ctx, request(), failing)
            .await
            .unwrap();
        assert!(!degraded.from_cache);
        assert_eq!(degraded.result, json!({"status": "unknown"}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_synchronous_primary_panic_degrades() {
        let strategy = strategy();
        strategy.register_fallback(cached_handler()).unwrap();

        let response = strategy
            .execute_with_fallback(
                &RequestContext::new(),
                request(),
                |_ctx, _req| -> std::future::Ready<PrimaryResult> { panic!("bad request") },
            )
            .await
            .unwrap();

        assert!(response.fallback_used);
        assert!(response.error.unwrap().contains("primary panicked"));
        assert_eq!(strategy.get_stats().fallback_successes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_timeouts_do_not_overflow() {
        let strategy = FallbackStrategy::new(
            "test",
            FallbackConfig::default()
                .timeout(Duration::MAX)
                .retries(1, Duration::MAX),
        )
        .unwrap();
        strategy
            .register_fallback(cached_handler().timeout(Duration::MAX))
            .unwrap();

        let response = strategy
            .execute_with_fallback(&RequestContext::new(), request(), |ctx, req| async move {
                assert_eq!(ctx.deadline(), None);
                succeeding(ctx, req).await
            })
            .await
            .unwrap();
        assert!(!response.fallback_used);

        let degraded = strategy
            .execute_with_fallback(
                &RequestContext::new().with_timeout(Duration::from_secs(1)),
                request().with_cache_key("other"),
                failing,
            )
            .await
            .unwrap();
        assert!(degraded.fallback_used);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_ttl_overrides_config() {
        let strategy = strategy();
        strategy
            .register_fallback(cached_handler().cache_ttl(Duration::from_millis(50)))
            .unwrap();
        let ctx = RequestContext::new();

        strategy
            .execute_with_fallback(&ctx, request(), succeeding)
            .await
            .unwrap();
        tokio::time::advance(Duration::from_millis(60)).await;

        assert_eq!(strategy.purge_expired_cache(), 1);
        assert_eq!(strategy.cache_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_cache_disabled_skips_caching() {
        let strategy = strategy();
        strategy.register_fallback(cached_handler().cache(false)).unwrap();

        strategy
            .execute_with_fallback(&RequestContext::new(), request(), succeeding)
            .await
            .unwrap();

        assert_eq!(strategy.cache_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_handler_type() {
        let kinds = [
            FallbackKind::AlternativeService {
                service: "kyc-backup".to_string(),
                endpoint: None,
                payload: Value::Null,
            },
            FallbackKind::DegradedMode {
                disabled_features: vec!["pep-screening".to_string()],
                message: "basic checks only".to_string(),
                payload: Value::Null,
            },
            FallbackKind::DefaultResponse {
                value: json!({"status": "pending"}),
            },
        ];

        for kind in kinds {
            let expected = kind.fallback_type();
            let strategy = strategy();
            strategy
                .register_fallback(FallbackHandler::new("h", "kyc", kind))
                .unwrap();

            let response = strategy
                .execute_with_fallback(&RequestContext::new(), request(), failing)
                .await
                .unwrap();

            assert!(response.success);
            assert!(response.fallback_used);
            assert_eq!(response.fallback_type, Some(expected));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_handler_surfaces_error() {
        let strategy = strategy();
        strategy.register_fallback(cached_handler().enabled(false)).unwrap();

        let err = strategy
            .execute_with_fallback(&RequestContext::new(), request(), failing)
            .await
            .unwrap_err();

        assert!(err.is_fallback_disabled());
        assert!(err.to_string().contains("disabled"));
        assert!(err.to_string().contains("upstream 503"));
        assert_eq!(strategy.get_stats().failed_requests, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_handler_returns_original_error() {
        let strategy = strategy();

        let err = strategy
            .execute_with_fallback(&RequestContext::new(), request(), failing)
            .await
            .unwrap_err();

        assert!(matches!(err, ResilienceError::Processor { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_succeeds() {
        let strategy = FallbackStrategy::new(
            "test",
            FallbackConfig::default().retries(2, Duration::from_millis(10)),
        )
        .unwrap();
        strategy.register_fallback(cached_handler()).unwrap();
        let calls = AtomicU32::new(0);

        let response = strategy
            .execute_with_fallback(&RequestContext::new(), request(), |_ctx, req| {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call < 2 {
                        Err::<FallbackResponse, BoxError>("flaky".into())
                    } else {
                        Ok(FallbackResponse::success(req.id, json!("ok")))
                    }
                }
            })
            .await
            .unwrap();

        assert!(!response.fallback_used);
        assert_eq!(response.result, json!("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(strategy.get_stats().retries, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_bounded_by_handler_timeout() {
        let strategy = strategy();
        strategy
            .register_fallback(
                FallbackHandler::new(
                    "h",
                    "kyc",
                    FallbackKind::DefaultResponse { value: json!(null) },
                )
                .timeout(Duration::from_millis(20)),
            )
            .unwrap();

        let response = strategy
            .execute_with_fallback(&RequestContext::new(), request(), |_ctx, req| async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, BoxError>(FallbackResponse::success(req.id, json!("late")))
            })
            .await
            .unwrap();

        assert!(response.fallback_used);
        assert!(response.error.unwrap().contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_not_degraded() {
        let strategy = strategy();
        strategy.register_fallback(cached_handler()).unwrap();
        let ctx = RequestContext::new();
        ctx.cancel();

        let err = strategy
            .execute_with_fallback(&ctx, request(), succeeding)
            .await
            .unwrap_err();

        assert!(matches!(err, ResilienceError::Cancelled { .. }));
    }

    #[test]
    fn test_registry_operations() {
        let strategy = strategy();
        strategy.register_fallback(cached_handler()).unwrap();
        assert!(strategy.handler("kyc").is_some());

        strategy.set_enabled("kyc", false).unwrap();
        assert!(!strategy.handler("kyc").unwrap().enabled);
        assert!(strategy.set_enabled("aml", true).is_err());

        let removed = strategy.unregister_fallback("kyc").unwrap();
        assert_eq!(removed.name, "kyc-cache");
        assert!(matches!(
            strategy.unregister_fallback("kyc"),
            Err(ResilienceError::FallbackNotRegistered { .. })
        ));
    }

    #[test]
    fn test_invoke_fallback_directly() {
        let strategy = strategy();
        let err = strategy
            .invoke_fallback(&request(), ResilienceError::processor("kyc", "down"))
            .unwrap_err();
        assert!(matches!(err, ResilienceError::FallbackNotRegistered { .. }));

        strategy
            .register_fallback(FallbackHandler::new(
                "h",
                "kyc",
                FallbackKind::DefaultResponse { value: json!(0) },
            ))
            .unwrap();
        let response = strategy
            .invoke_fallback(&request(), ResilienceError::processor("kyc", "down"))
            .unwrap();
        assert_eq!(response.fallback_type, Some(FallbackType::DefaultResponse));
    }

    #[test]
    fn test_reregistration_overwrites() {
        let strategy = strategy();
        strategy.register_fallback(cached_handler()).unwrap();
        strategy
            .register_fallback(FallbackHandler::new(
                "kyc-default",
                "kyc",
                FallbackKind::DefaultResponse { value: json!(1) },
            ))
            .unwrap();

        assert_eq!(strategy.handlers().len(), 1);
        assert_eq!(strategy.handler("kyc").unwrap().name, "kyc-default");
    }
}
