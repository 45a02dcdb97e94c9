// Core library for the Bulwark resilience layer
// Bounded pools, deadlines, retries and fallback handlers for downstream calls

pub mod context;
pub mod duration_ms;
pub mod error;
pub mod resilience;

// Re-export commonly used types
pub use context::*;
pub use error::*;
pub use resilience::*;

/// Everything needed to protect a downstream call.
pub mod prelude {
    pub use crate::context::RequestContext;
    pub use crate::error::{BoxError, ResilienceError, Result};
    pub use crate::resilience::{
        BackoffStrategy, Bulkhead, BulkheadConfig, BulkheadManager, BulkheadRequest,
        BulkheadResponse, BulkheadStats, FallbackConfig, FallbackHandler, FallbackKind,
        FallbackManager, FallbackRequest, FallbackResponse, FallbackStats, FallbackStrategy,
        FallbackType,
    };
    pub use std::time::Duration;
}
