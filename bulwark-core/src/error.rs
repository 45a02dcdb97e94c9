// Error types for the Bulwark resilience core

use std::time::Duration;
use thiserror::Error;

/// Boxed error returned by caller-supplied processors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse classification of a [`ResilienceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PoolFull,
    QueueTimeout,
    Timeout,
    Cancelled,
    Processor,
    FallbackDisabled,
    FallbackNotRegistered,
    InvalidConfig,
}

#[derive(Error, Debug)]
pub enum ResilienceError {
    #[error(
        "Pool full for service '{service}': {max_concurrency} running and {max_queue_size} queued"
    )]
    PoolFull {
        service: String,
        max_concurrency: u32,
        max_queue_size: u32,
    },

    #[error("Timed out after {waited:?} waiting in queue for service '{service}'")]
    QueueTimeout { service: String, waited: Duration },

    #[error("Request to service '{service}' timed out after {timeout:?}")]
    Timeout { service: String, timeout: Duration },

    #[error("Request to service '{service}' was cancelled")]
    Cancelled { service: String },

    #[error("Processor failed for service '{service}': {source}")]
    Processor {
        service: String,
        #[source]
        source: BoxError,
    },

    #[error("Fallback disabled for service '{service}': {source}")]
    FallbackDisabled {
        service: String,
        #[source]
        source: Box<ResilienceError>,
    },

    #[error("No fallback registered for service '{service}'")]
    FallbackNotRegistered { service: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ResilienceError {
    /// Wrap a processor failure.
    pub fn processor(service: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Processor {
            service: service.into(),
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PoolFull { .. } => ErrorKind::PoolFull,
            Self::QueueTimeout { .. } => ErrorKind::QueueTimeout,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Processor { .. } => ErrorKind::Processor,
            Self::FallbackDisabled { .. } => ErrorKind::FallbackDisabled,
            Self::FallbackNotRegistered { .. } => ErrorKind::FallbackNotRegistered,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }

    /// The service the failure is attributed to, if any.
    pub fn service(&self) -> Option<&str> {
        match self {
            Self::PoolFull { service, .. }
            | Self::QueueTimeout { service, .. }
            | Self::Timeout { service, .. }
            | Self::Cancelled { service }
            | Self::Processor { service, .. }
            | Self::FallbackDisabled { service, .. }
            | Self::FallbackNotRegistered { service } => Some(service),
            Self::InvalidConfig(_) => None,
        }
    }

    /// Deadline exceeded, either while queued or while executing.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::QueueTimeout { .. })
    }

    /// Refused before the processor ran.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::PoolFull { .. } | Self::QueueTimeout { .. })
    }

    /// Whether the caller may reasonably try again later.
    ///
    /// Cancellation and configuration errors are final; everything raised by
    /// load or by the downstream itself is worth another attempt.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::PoolFull { .. }
            | Self::QueueTimeout { .. }
            | Self::Timeout { .. }
            | Self::Processor { .. } => true,
            Self::FallbackDisabled { source, .. } => source.is_retriable(),
            Self::Cancelled { .. }
            | Self::FallbackNotRegistered { .. }
            | Self::InvalidConfig(_) => false,
        }
    }

    /// Whether this is the "fallback disabled" annotation.
    pub fn is_fallback_disabled(&self) -> bool {
        matches!(self, Self::FallbackDisabled { .. })
    }
}

pub type Result<T> = std::result::Result<T, ResilienceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let full = ResilienceError::PoolFull {
            service: "compliance".to_string(),
            max_concurrency: 2,
            max_queue_size: 5,
        };
        assert!(full.is_rejection());
        assert!(!full.is_timeout());
        assert_eq!(full.kind(), ErrorKind::PoolFull);

        let queued = ResilienceError::QueueTimeout {
            service: "compliance".to_string(),
            waited: Duration::from_millis(50),
        };
        assert!(queued.is_rejection());
        assert!(queued.is_timeout());

        let timeout = ResilienceError::Timeout {
            service: "ml".to_string(),
            timeout: Duration::from_millis(50),
        };
        assert!(timeout.is_timeout());
        assert!(!timeout.is_rejection());
        assert_eq!(timeout.service(), Some("ml"));
    }

    #[test]
    fn test_fallback_disabled_keeps_source() {
        use std::error::Error as _;

        let err = ResilienceError::FallbackDisabled {
            service: "scoring".to_string(),
            source: Box::new(ResilienceError::processor("scoring", "upstream 503")),
        };

        assert!(err.to_string().contains("disabled"));
        assert!(err.is_fallback_disabled());
        let source = err.source().unwrap();
        assert!(source.to_string().contains("upstream 503"));
    }

    #[test]
    fn test_cancelled_not_retriable() {
        let err = ResilienceError::Cancelled {
            service: "db".to_string(),
        };
        assert!(!err.is_retriable());
        assert!(ResilienceError::processor("db", "boom").is_retriable());
    }
}
