//! Serde helpers encoding [`Duration`] values as integer milliseconds.
//!
//! ```rust,ignore
//! #[derive(Serialize, Deserialize)]
//! struct Limits {
//!     #[serde(with = "bulwark_core::duration_ms")]
//!     timeout: Duration,
//!     #[serde(with = "bulwark_core::duration_ms::option", default)]
//!     override_timeout: Option<Duration>,
//! }
//! ```

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}

pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => super::serialize(d, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Limits {
        #[serde(with = "super")]
        timeout: Duration,
        #[serde(with = "super::option", default)]
        retry: Option<Duration>,
    }

    #[test]
    fn test_millis_encoding() {
        let limits = Limits {
            timeout: Duration::from_millis(1500),
            retry: None,
        };
        let json = serde_json::to_value(&limits).unwrap();
        assert_eq!(json["timeout"], 1500);
        assert!(json["retry"].is_null());

        let parsed: Limits = serde_json::from_str(r#"{"timeout": 250, "retry": 10}"#).unwrap();
        assert_eq!(parsed.timeout, Duration::from_millis(250));
        assert_eq!(parsed.retry, Some(Duration::from_millis(10)));

        let missing: Limits = serde_json::from_str(r#"{"timeout": 1}"#).unwrap();
        assert_eq!(missing.retry, None);
    }
}
