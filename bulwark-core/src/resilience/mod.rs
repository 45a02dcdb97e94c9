//! # Resilience Patterns
//!
//! Isolation and graceful degradation for calls to slow or overloaded
//! downstream services.
//!
//! ## Patterns Included
//!
//! - **Bulkhead**: Per-service pools bounding concurrency and queueing
//! - **Timeout**: Deadlines enforced on queue wait and execution
//! - **Retry**: Backoff strategies for primary calls
//! - **Fallback**: Typed handlers substituting degraded responses
//! - **Managers**: Named registries handing out shared instances
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bulwark_core::prelude::*;
//!
//! let bulkheads = BulkheadManager::new();
//! let bulkhead = bulkheads.get_bulkhead("risk-api", BulkheadConfig::new(8, 32))?;
//! bulkhead.create_pool("compliance", 2, 5, Duration::from_secs(3))?;
//!
//! let response = bulkhead
//!     .execute(&RequestContext::new(), request, |ctx, req| async move {
//!         compliance_client.check(&ctx, req).await
//!     })
//!     .await?;
//! ```

mod bulkhead;
mod cache;
mod fallback;
mod manager;
mod pool;
mod retry;
mod stats;
mod strategy;
mod timeout;

pub use bulkhead::*;
pub use cache::*;
pub use fallback::*;
pub use manager::*;
pub use pool::*;
pub use retry::*;
pub use stats::*;
pub use strategy::*;
pub use timeout::*;
