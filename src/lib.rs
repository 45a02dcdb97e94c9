// Bulwark - bulkhead and fallback resilience for async Rust services
//
// This library isolates calls to slow or overloaded downstream services in
// bounded pools and degrades gracefully when they fail.

// Re-export core functionality
pub use bulwark_core::*;

// Payloads are opaque JSON values
pub use serde_json::{Value, json};

// Re-export optional crates
#[cfg(feature = "config")]
pub use bulwark_config;

#[cfg(feature = "log")]
pub use bulwark_log;

// Prelude for common imports
pub mod prelude {
    pub use bulwark_core::prelude::*;
    pub use serde_json::{Value, json};

    #[cfg(feature = "config")]
    pub use bulwark_config::{Registries, ResilienceSettings};

    #[cfg(feature = "log")]
    pub use bulwark_log::LogConfig;
}
