// Environment variable loading

use crate::{ConfigError, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::env;
use std::path::Path;

/// Default prefix for Bulwark environment variables.
pub const ENV_PREFIX: &str = "BULWARK";

/// Separator between nested keys, e.g.
/// `BULWARK_BULKHEADS__RISK_API__DEFAULT_MAX_CONCURRENCY=4`.
pub const PATH_SEPARATOR: &str = "__";

/// Environment variable loader
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Loader for `BULWARK_*` variables.
    pub fn bulwark() -> Self {
        Self::new(Some(ENV_PREFIX.to_string()))
    }

    /// Load `.env` into the process environment.
    ///
    /// A missing default `.env` is not an error; an explicit path must exist.
    pub fn load_dotenv(path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        Ok(())
    }

    /// Load all matching environment variables, keys lowercased and stripped
    /// of the prefix.
    pub fn load(&self) -> Result<HashMap<String, String>> {
        Ok(self.filter(env::vars()))
    }

    /// Load a specific environment variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        env::var(self.full_key(key)).map_err(ConfigError::EnvError)
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Overlay the process environment onto `target`.
    pub fn apply(&self, target: &mut Value) -> Result<usize> {
        let vars = self.load()?;
        Ok(Self::overlay(target, vars))
    }

    /// Overlay already filtered `vars` onto `target`.
    ///
    /// Each key is split on `__` into a path of object keys. Values that parse
    /// as JSON (numbers, booleans, arrays) keep that type; anything else is
    /// stored as a string. Returns the number of values written.
    pub fn overlay(target: &mut Value, vars: impl IntoIterator<Item = (String, String)>) -> usize {
        let mut applied = 0;
        for (key, raw) in vars {
            let path: Vec<&str> = key
                .split(PATH_SEPARATOR)
                .filter(|segment| !segment.is_empty())
                .collect();
            if path.is_empty() {
                continue;
            }

            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            if let Value::Object(root) = target {
                insert_path(root, &path, parse_value(&raw));
            }
            applied += 1;
        }
        applied
    }

    fn full_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }

    fn filter(&self, vars: impl IntoIterator<Item = (String, String)>) -> HashMap<String, String> {
        vars.into_iter()
            .filter_map(|(key, value)| match &self.prefix {
                Some(prefix) => key
                    .strip_prefix(prefix.as_str())
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| (rest.to_lowercase(), value)),
                None => Some((key.to_lowercase(), value)),
            })
            .collect()
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::bulwark()
    }
}

fn insert_path(map: &mut Map<String, Value>, path: &[&str], value: Value) {
    match path {
        [] => {}
        [last] => {
            map.insert((*last).to_string(), value);
        }
        [first, rest @ ..] => {
            let child = map
                .entry((*first).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child) = child {
                insert_path(child, rest, value);
            }
        }
    }
}

fn parse_value(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Number(_) | Value::Bool(_) | Value::Array(_) | Value::Object(_))) => {
            value
        }
        _ => Value::String(raw.to_string()),
    }
}
