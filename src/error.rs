//! # Error Types
//!
//! Structured error taxonomy for the decision-serving core.
//!
//! Only [`DecisionError::Configuration`] is allowed to abort anything, and only at
//! construction time. Every other variant is caught where it originates, counted,
//! and converted into a cache miss or a fallback decision by the service layer.

use crate::config::ConfigurationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecisionError {
    /// Network or connection failure talking to the cache store
    #[error("Cache store unavailable: {0}")]
    StoreUnavailable(String),

    /// Cached payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Compute step exceeded its deadline
    #[error("Compute timed out after {timeout_ms}ms on {backend}")]
    ComputeTimeout { backend: String, timeout_ms: u64 },

    /// Compute step returned an error before its deadline
    #[error("Compute failed on {backend}: {message}")]
    ComputeFailed { backend: String, message: String },

    /// Invalid configuration detected while building a component
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Malformed request context
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Alert sink rejected an event
    #[error("Alert publish failed: {0}")]
    AlertPublish(String),
}

impl DecisionError {
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable(message.into())
    }

    pub fn compute_failed(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ComputeFailed {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Errors the cache layer absorbs by proceeding as if the entry were absent
    pub fn is_fail_open(&self) -> bool {
        matches!(
            self,
            DecisionError::StoreUnavailable(_) | DecisionError::Serialization(_)
        )
    }

    /// Short stable label used as a metrics/log dimension
    pub fn kind(&self) -> &'static str {
        match self {
            DecisionError::StoreUnavailable(_) => "store_unavailable",
            DecisionError::Serialization(_) => "serialization",
            DecisionError::ComputeTimeout { .. } => "compute_timeout",
            DecisionError::ComputeFailed { .. } => "compute_failed",
            DecisionError::Configuration(_) => "configuration",
            DecisionError::InvalidRequest(_) => "invalid_request",
            DecisionError::AlertPublish(_) => "alert_publish",
        }
    }
}

impl From<serde_json::Error> for DecisionError {
    fn from(err: serde_json::Error) -> Self {
        DecisionError::Serialization(err.to_string())
    }
}

#[cfg(feature = "redis-store")]
impl From<redis::RedisError> for DecisionError {
    fn from(err: redis::RedisError) -> Self {
        DecisionError::StoreUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DecisionError>;
