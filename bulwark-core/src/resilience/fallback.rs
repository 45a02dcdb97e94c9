//! Fallback handler definitions for graceful degradation.
//!
//! A [`FallbackHandler`] says how one service degrades when its primary call
//! fails. The degradation itself is a typed [`FallbackKind`]; the strategy
//! matches on it to build the substitute response.
//!
//! ## Example
//!
//! ```rust,ignore
//! use bulwark_core::resilience::{FallbackHandler, FallbackKind};
//!
//! let handler = FallbackHandler::new(
//!     "scoring-degraded",
//!     "ml-ensemble",
//!     FallbackKind::DegradedMode {
//!         disabled_features: vec!["ensemble".into()],
//!         message: "Scored with rules engine only".into(),
//!         payload: json!({"risk_score": null}),
//!     },
//! );
//! strategy.register_fallback(handler)?;
//! ```

use crate::error::{ResilienceError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::num::NonZeroUsize;
use std::time::Duration;

use crate::resilience::retry::BackoffStrategy;

/// The four ways a service can degrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackType {
    CachedResponse,
    AlternativeService,
    DegradedMode,
    DefaultResponse,
}

impl FallbackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CachedResponse => "cached_response",
            Self::AlternativeService => "alternative_service",
            Self::DegradedMode => "degraded_mode",
            Self::DefaultResponse => "default_response",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "cached_response" => Some(Self::CachedResponse),
            "alternative_service" => Some(Self::AlternativeService),
            "degraded_mode" => Some(Self::DegradedMode),
            "default_response" => Some(Self::DefaultResponse),
            _ => None,
        }
    }
}

impl std::fmt::Display for FallbackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific handler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FallbackKind {
    /// Serve the last good response; `default` when nothing fresh is cached.
    CachedResponse {
        #[serde(default)]
        default: Value,
    },
    /// Point the caller at another provider of the same data.
    AlternativeService {
        service: String,
        #[serde(default)]
        endpoint: Option<String>,
        #[serde(default)]
        payload: Value,
    },
    /// Answer with reduced functionality.
    DegradedMode {
        #[serde(default)]
        disabled_features: Vec<String>,
        #[serde(default)]
        message: String,
        #[serde(default)]
        payload: Value,
    },
    /// A fixed answer.
    DefaultResponse { value: Value },
}

impl FallbackKind {
    pub fn fallback_type(&self) -> FallbackType {
        match self {
            Self::CachedResponse { .. } => FallbackType::CachedResponse,
            Self::AlternativeService { .. } => FallbackType::AlternativeService,
            Self::DegradedMode { .. } => FallbackType::DegradedMode,
            Self::DefaultResponse { .. } => FallbackType::DefaultResponse,
        }
    }

    /// The substitute value produced when no cached value applies.
    pub fn substitute(&self) -> Value {
        match self {
            Self::CachedResponse { default } => default.clone(),
            Self::AlternativeService {
                service,
                endpoint,
                payload,
            } => json!({
                "fallback_type": FallbackType::AlternativeService.as_str(),
                "alternative_service": service,
                "endpoint": endpoint,
                "data": payload,
            }),
            Self::DegradedMode {
                disabled_features,
                message,
                payload,
            } => json!({
                "fallback_type": FallbackType::DegradedMode.as_str(),
                "disabled_features": disabled_features,
                "message": message,
                "data": payload,
            }),
            Self::DefaultResponse { value } => value.clone(),
        }
    }
}

/// How one service degrades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackHandler {
    pub name: String,
    /// Lookup key.
    pub service: String,
    #[serde(flatten)]
    pub kind: FallbackKind,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    /// Bounds each primary attempt for this service when set.
    #[serde(rename = "timeout_ms", with = "crate::duration_ms::option", default)]
    pub timeout: Option<Duration>,
    #[serde(default = "enabled_default")]
    pub cache_enabled: bool,
    /// Overrides the strategy's cache TTL when set.
    #[serde(rename = "cache_ttl_ms", with = "crate::duration_ms::option", default)]
    pub cache_ttl: Option<Duration>,
}

fn enabled_default() -> bool {
    true
}

impl FallbackHandler {
    /// Create an enabled handler with caching on.
    pub fn new(name: impl Into<String>, service: impl Into<String>, kind: FallbackKind) -> Self {
        Self {
            name: name.into(),
            service: service.into(),
            kind,
            enabled: true,
            timeout: None,
            cache_enabled: true,
            cache_ttl: None,
        }
    }

    pub fn fallback_type(&self) -> FallbackType {
        self.kind.fallback_type()
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ResilienceError::InvalidConfig(
                "fallback handler name cannot be empty".to_string(),
            ));
        }
        if self.service.trim().is_empty() {
            return Err(ResilienceError::InvalidConfig(format!(
                "fallback handler '{}': service cannot be empty",
                self.name
            )));
        }
        if let FallbackKind::AlternativeService { service, .. } = &self.kind
            && service.trim().is_empty()
        {
            return Err(ResilienceError::InvalidConfig(format!(
                "fallback handler '{}': alternative service cannot be empty",
                self.name
            )));
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(ResilienceError::InvalidConfig(format!(
                "fallback handler '{}': timeout must be greater than zero",
                self.name
            )));
        }
        Ok(())
    }
}

/// Fallback strategy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Bound on each primary attempt.
    #[serde(rename = "default_timeout_ms", with = "crate::duration_ms")]
    pub default_timeout: Duration,
    /// Cache successful primary responses for `cached_response` handlers.
    pub enable_caching: bool,
    #[serde(rename = "cache_ttl_ms", with = "crate::duration_ms")]
    pub cache_ttl: Duration,
    /// Maximum cached entries.
    pub cache_capacity: NonZeroUsize,
    /// Record strategy statistics.
    pub enable_metrics: bool,
    /// Emit tracing events.
    pub enable_logging: bool,
    /// Extra primary attempts before falling back.
    pub max_retries: u32,
    #[serde(rename = "retry_delay_ms", with = "crate::duration_ms")]
    pub retry_delay: Duration,
    /// Growth of the delay between attempts. Constant when unset.
    pub retry_backoff: Option<BackoffStrategy>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            enable_caching: true,
            cache_ttl: Duration::from_secs(300),
            cache_capacity: NonZeroUsize::new(1024).unwrap_or(NonZeroUsize::MIN),
            enable_metrics: true,
            enable_logging: true,
            max_retries: 0,
            retry_delay: Duration::from_millis(100),
            retry_backoff: None,
        }
    }
}

impl FallbackConfig {
    /// Set the per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Enable caching with a TTL.
    pub fn caching(mut self, enable: bool, ttl: Duration) -> Self {
        self.enable_caching = enable;
        self.cache_ttl = ttl;
        self
    }

    /// Retry the primary `max_retries` times, `delay` apart.
    pub fn retries(mut self, max_retries: u32, delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = delay;
        self
    }

    pub fn backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.retry_backoff = Some(backoff);
        self
    }

    pub fn metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = enable;
        self
    }

    pub fn logging(mut self, enable: bool) -> Self {
        self.enable_logging = enable;
        self
    }

    /// The backoff actually used between primary attempts.
    pub fn effective_backoff(&self) -> BackoffStrategy {
        self.retry_backoff
            .clone()
            .unwrap_or_else(|| BackoffStrategy::constant(self.retry_delay))
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_timeout.is_zero() {
            return Err(ResilienceError::InvalidConfig(
                "fallback default_timeout must be greater than zero".to_string(),
            ));
        }
        if self.enable_caching && self.cache_ttl.is_zero() {
            return Err(ResilienceError::InvalidConfig(
                "cache_ttl must be greater than zero when caching is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// A unit of work submitted to a fallback strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackRequest {
    pub id: String,
    /// Handler lookup key.
    pub service: String,
    pub operation: String,
    pub data: Value,
    #[serde(rename = "timeout_ms", with = "crate::duration_ms::option", default)]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub priority: i32,
    /// Explicit cache key; derived from operation and data when unset.
    #[serde(default)]
    pub cache_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FallbackRequest {
    pub fn new(service: impl Into<String>, operation: impl Into<String>, data: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            service: service.into(),
            operation: operation.into(),
            data,
            timeout: None,
            priority: 0,
            cache_key: None,
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

    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    /// Key identifying equivalent requests within a service.
    pub fn request_key(&self) -> String {
        match &self.cache_key {
            Some(key) => key.clone(),
            None => format!("{}:{}", self.operation, self.data),
        }
    }
}

/// Result of a fallback-protected call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackResponse {
    pub id: String,
    pub success: bool,
    pub result: Value,
    pub fallback_used: bool,
    #[serde(default)]
    pub fallback_type: Option<FallbackType>,
    /// Served from the response cache.
    #[serde(default)]
    pub from_cache: bool,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "latency_ms", with = "crate::duration_ms::option", default)]
    pub latency: Option<Duration>,
    /// The primary failure when a fallback answered.
    #[serde(default)]
    pub error: Option<String>,
}

impl FallbackResponse {
    pub fn success(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            success: true,
            result,
            fallback_used: false,
            fallback_type: None,
            from_cache: false,
            created_at: Utc::now(),
            latency: None,
            error: None,
        }
    }

    pub(crate) fn degraded(
        id: impl Into<String>,
        result: Value,
        fallback_type: FallbackType,
        from_cache: bool,
        primary_error: String,
    ) -> Self {
        Self {
            id: id.into(),
            success: true,
            result,
            fallback_used: true,
            fallback_type: Some(fallback_type),
            from_cache,
            created_at: Utc::now(),
            latency: None,
            error: Some(primary_error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names_round_trip() {
        for ty in [
            FallbackType::CachedResponse,
            FallbackType::AlternativeService,
            FallbackType::DegradedMode,
            FallbackType::DefaultResponse,
        ] {
            assert_eq!(FallbackType::from_str(ty.as_str()), Some(ty));
        }
        assert_eq!(FallbackType::from_str("circuit_breaker"), None);
    }

    #[test]
    fn test_handler_validation() {
        let kind = FallbackKind::DefaultResponse { value: json!(0) };
        assert!(FallbackHandler::new("h", "svc", kind.clone()).validate().is_ok());
        assert!(FallbackHandler::new("", "svc", kind.clone()).validate().is_err());
        assert!(FallbackHandler::new("h", " ", kind).validate().is_err());

        let alt = FallbackKind::AlternativeService {
            service: String::new(),
            endpoint: None,
            payload: Value::Null,
        };
        assert!(FallbackHandler::new("h", "svc", alt).validate().is_err());
    }

    #[test]
    fn test_substitute_is_tagged() {
        let degraded = FallbackKind::DegradedMode {
            disabled_features: vec!["ensemble".to_string()],
            message: "rules only".to_string(),
            payload: json!({"score": 0.5}),
        };
        let value = degraded.substitute();
        assert_eq!(value["fallback_type"], "degraded_mode");
        assert_eq!(value["disabled_features"][0], "ensemble");
        assert_eq!(value["data"]["score"], 0.5);

        let alt = FallbackKind::AlternativeService {
            service: "backup-kyc".to_string(),
            endpoint: Some("https://kyc.backup.internal".to_string()),
            payload: Value::Null,
        };
        assert_eq!(alt.substitute()["alternative_service"], "backup-kyc");
    }

    #[test]
    fn test_handler_deserializes_tagged_kind() {
        let handler: FallbackHandler = serde_json::from_value(json!({
            "name": "kyc-cache",
            "service": "kyc",
            "type": "cached_response",
            "default": {"status": "unknown"},
            "cache_ttl_ms": 60000
        }))
        .unwrap();

        assert_eq!(handler.fallback_type(), FallbackType::CachedResponse);
        assert!(handler.enabled);
        assert!(handler.cache_enabled);
        assert_eq!(handler.cache_ttl, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_request_key() {
        let req = FallbackRequest::new("kyc", "lookup", json!({"id": 7}));
        assert_eq!(req.request_key(), r#"lookup:{"id":7}"#);
        assert_eq!(req.with_cache_key("tenant-1").request_key(), "tenant-1");
    }

    #[test]
    fn test_config_backoff_defaults_to_constant() {
        let config = FallbackConfig::default().retries(2, Duration::from_millis(5));
        assert_eq!(
            config.effective_backoff().delay_for_attempt(3),
            Duration::from_millis(5)
        );
    }
}
