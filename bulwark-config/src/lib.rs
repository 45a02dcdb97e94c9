// Configuration management for Bulwark bulkheads and fallback strategies
//
// Settings come from a TOML or JSON file, are overlaid with `BULWARK_*`
// environment variables (nested keys joined by `__`), validated, and then
// turned into ready-to-use managers.
//
// ```rust,ignore
// use bulwark_config::ResilienceSettings;
//
// let registries = ResilienceSettings::load("config/resilience.toml")?.build()?;
// let bulkhead = registries.bulkheads.get("risk_api").expect("configured");
// ```

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{FileFormat, SettingsLoader};
pub use settings::{BulkheadSettings, FallbackSettings, PoolSettings, Registries, ResilienceSettings};
pub use validation::{ConfigValidator, Validate};

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Deserialize any settings type from a tree and validate it.
pub fn load_validated<T: DeserializeOwned + Validate>(value: Value) -> Result<T> {
    let validated: T = serde_json::from_value(value)
        .map_err(|e| ConfigError::DeserializationError(e.to_string()))?;

    validated.validate()?;

    Ok(validated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_validated() {
        let settings: ResilienceSettings = load_validated(json!({
            "bulkheads": {"api": {"default_max_concurrency": 4}}
        }))
        .unwrap();
        assert_eq!(settings.bulkheads["api"].config.default_max_concurrency, 4);

        let invalid = load_validated::<ResilienceSettings>(json!({
            "bulkheads": {"api": {"default_max_concurrency": 0}}
        }));
        assert!(matches!(invalid, Err(ConfigError::ValidationError(_))));
    }
}
