// Resilience settings: file/env model and registry construction

use crate::{ConfigError, ConfigValidator, EnvLoader, FileFormat, Result, SettingsLoader, Validate};
use bulwark_core::{
    BulkheadConfig, BulkheadManager, FallbackConfig, FallbackHandler, FallbackKind,
    FallbackManager, ResilienceError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Every bulkhead and fallback strategy of a process.
///
/// ```toml
/// [bulkheads.risk_api]
/// default_max_concurrency = 8
///
/// [bulkheads.risk_api.pools.compliance]
/// max_concurrency = 2
/// max_queue_size = 5
/// timeout_ms = 3000
///
/// [[fallbacks.scoring.handlers]]
/// name = "kyc-cache"
/// service = "kyc"
/// type = "cached_response"
/// default = { status = "unknown" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceSettings {
    pub bulkheads: BTreeMap<String, BulkheadSettings>,
    pub fallbacks: BTreeMap<String, FallbackSettings>,
}

/// One bulkhead: defaults plus explicitly sized pools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkheadSettings {
    #[serde(flatten)]
    pub config: BulkheadConfig,
    #[serde(default)]
    pub pools: BTreeMap<String, PoolSettings>,
}

/// Limits of one pool. Unset fields take the bulkhead defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolSettings {
    #[serde(default)]
    pub max_concurrency: Option<u32>,
    #[serde(default)]
    pub max_queue_size: Option<u32>,
    #[serde(
        rename = "timeout_ms",
        with = "bulwark_core::duration_ms::option",
        default
    )]
    pub timeout: Option<Duration>,
}

/// One fallback strategy and its handlers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FallbackSettings {
    #[serde(flatten)]
    pub config: FallbackConfig,
    #[serde(default)]
    pub handlers: Vec<FallbackHandler>,
}

/// Managers built from settings.
#[derive(Debug, Clone, Default)]
pub struct Registries {
    pub bulkheads: Arc<BulkheadManager>,
    pub fallbacks: Arc<FallbackManager>,
}

impl ResilienceSettings {
    /// Deserialize from an already parsed tree.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| ConfigError::DeserializationError(e.to_string()))
    }

    /// Parse file content without environment overrides.
    pub fn parse(content: &str, format: FileFormat) -> Result<Self> {
        Self::from_value(SettingsLoader::new(format).parse(content)?)
    }

    /// Load a TOML or JSON file, then apply `.env` and `BULWARK_*` overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut value = SettingsLoader::auto(path)?.load_file(path)?;

        EnvLoader::load_dotenv(None)?;
        let overrides = EnvLoader::bulwark().apply(&mut value)?;

        info!(
            path = %path.display(),
            overrides,
            "Resilience settings loaded"
        );
        Self::from_value(value)
    }

    /// Settings from `BULWARK_*` variables alone.
    pub fn from_env() -> Result<Self> {
        let mut value = Value::Object(Default::default());
        EnvLoader::load_dotenv(None)?;
        EnvLoader::bulwark().apply(&mut value)?;
        Self::from_value(value)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializationError(e.to_string()))
    }

    /// Validate, then create every bulkhead, pool, strategy and handler.
    pub fn build(&self) -> Result<Registries> {
        self.validate()?;
        let registries = Registries::default();

        for (name, settings) in &self.bulkheads {
            let bulkhead = registries
                .bulkheads
                .get_bulkhead(name, settings.config.clone())?;
            for (service, pool) in &settings.pools {
                let defaults = &settings.config;
                bulkhead.create_pool(
                    service.as_str(),
                    pool.max_concurrency.unwrap_or(defaults.default_max_concurrency),
                    pool.max_queue_size.unwrap_or(defaults.default_max_queue_size),
                    pool.timeout.unwrap_or(defaults.default_timeout),
                )?;
            }
        }

        for (name, settings) in &self.fallbacks {
            let strategy = registries
                .fallbacks
                .get_strategy(name, settings.config.clone())?;
            for handler in &settings.handlers {
                strategy.register_fallback(handler.clone())?;
            }
        }

        info!(
            bulkheads = self.bulkheads.len(),
            fallbacks = self.fallbacks.len(),
            "Resilience registries built"
        );
        Ok(registries)
    }
}

fn invalid(context: String, err: ResilienceError) -> ConfigError {
    ConfigError::ValidationError(format!("{}: {}", context, err))
}

impl Validate for ResilienceSettings {
    fn validate(&self) -> Result<()> {
        for (name, settings) in &self.bulkheads {
            ConfigValidator::not_empty(name, "bulkhead name")?;
            settings
                .config
                .validate()
                .map_err(|e| invalid(format!("bulkhead '{}'", name), e))?;

            for (service, pool) in &settings.pools {
                let field = format!("bulkheads.{}.pools.{}", name, service);
                ConfigValidator::not_empty(service, &field)?;
                if let Some(max_concurrency) = pool.max_concurrency {
                    ConfigValidator::in_range(
                        max_concurrency,
                        1,
                        u32::MAX,
                        &format!("{}.max_concurrency", field),
                    )?;
                }
                if let Some(timeout) = pool.timeout {
                    ConfigValidator::positive_duration(timeout, &format!("{}.timeout_ms", field))?;
                }
            }
        }

        for (name, settings) in &self.fallbacks {
            ConfigValidator::not_empty(name, "fallback strategy name")?;
            settings
                .config
                .validate()
                .map_err(|e| invalid(format!("fallback strategy '{}'", name), e))?;

            for handler in &settings.handlers {
                handler
                    .validate()
                    .map_err(|e| invalid(format!("fallback strategy '{}'", name), e))?;
                if let FallbackKind::AlternativeService {
                    endpoint: Some(endpoint),
                    ..
                } = &handler.kind
                {
                    ConfigValidator::is_url(
                        endpoint,
                        &format!("handler '{}' endpoint", handler.name),
                    )?;
                }
            }
        }

        Ok(())
    }
}
