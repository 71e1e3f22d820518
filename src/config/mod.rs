//! # Configuration Management
//!
//! Strongly-typed configuration for the decision-serving core.
//!
//! Every field has a default, so partial configuration files and environment
//! overrides only need to name what they change. [`DecisionServiceConfig::validate`]
//! runs once when a service is built; nothing re-checks values at call time.
//!
//! ## Example
//!
//! ```rust
//! use decision_core::config::DecisionServiceConfig;
//!
//! let config = DecisionServiceConfig {
//!     ttl_seconds: 10,
//!     max_size: 500,
//!     ..DecisionServiceConfig::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

pub mod error;
pub mod loader;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

use crate::models::RequestContext;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for a [`DecisionService`](crate::services::DecisionService)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DecisionServiceConfig {
    /// TTL applied to every cache write
    pub ttl_seconds: u64,
    /// Maximum number of entries kept under `key_prefix`
    pub max_size: usize,
    /// Consecutive failed health probes before entering DEGRADED
    pub failure_threshold: u32,
    /// Health probe cadence, also the wait between failed recovery attempts
    pub recovery_check_interval_seconds: u64,
    /// Hit rate the composite health check expects
    pub hit_rate_target: f64,
    /// `low_hit_rate` fires below this
    pub alert_hit_rate_threshold: f64,
    /// `high_error_rate` fires above this
    pub alert_error_rate_threshold: f64,
    /// Minimum spacing between published monitor alerts, also the evaluation cadence
    pub alert_check_interval_seconds: u64,
    /// Deadline for the local (NORMAL path) compute and for health probes
    pub local_inference_timeout_ms: u64,
    /// Deadline for the remote (DEGRADED path) compute
    pub cloud_timeout_ms: u64,
    /// Deadline applied to each individual cache store call
    pub cache_operation_timeout_ms: u64,
    /// Namespace prepended to every cache key
    pub key_prefix: String,
    /// Contexts written with placeholder decisions at startup
    pub warmup_seeds: Vec<RequestContext>,
    /// Request fields hashed into the fingerprint, alongside the symbol
    pub fingerprint_fields: Vec<String>,
    /// Upper bound on keys whose TTL is sampled per eviction pass
    pub eviction_sample_size: usize,
    /// Keys per DELETE call during eviction and clear
    pub eviction_batch_size: usize,
    /// COUNT hint passed to SCAN
    pub scan_count: usize,
    /// Composite health fails above this size utilization
    pub size_utilization_limit: f64,
    /// Number of recent request latencies kept for percentiles
    pub latency_window: usize,
    /// Connection string for the Redis store adapter
    pub redis_url: String,
}

impl Default for DecisionServiceConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 5,
            max_size: 10_000,
            failure_threshold: 3,
            recovery_check_interval_seconds: 10,
            hit_rate_target: 0.8,
            alert_hit_rate_threshold: 0.5,
            alert_error_rate_threshold: 0.1,
            alert_check_interval_seconds: 60,
            local_inference_timeout_ms: 20,
            cloud_timeout_ms: 100,
            cache_operation_timeout_ms: 50,
            key_prefix: "decision:".to_string(),
            warmup_seeds: Vec::new(),
            fingerprint_fields: vec!["price".to_string(), "volume".to_string()],
            eviction_sample_size: 1_000,
            eviction_batch_size: 100,
            scan_count: 500,
            size_utilization_limit: 0.95,
            latency_window: 1_000,
            redis_url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

impl DecisionServiceConfig {
    /// Test-optimized configuration with short intervals
    pub fn for_test() -> Self {
        Self {
            ttl_seconds: 5,
            max_size: 100,
            recovery_check_interval_seconds: 1,
            alert_check_interval_seconds: 1,
            eviction_batch_size: 10,
            scan_count: 10,
            latency_window: 100,
            ..Self::default()
        }
    }

    /// Validate the configuration, rejecting values that cannot work at runtime
    pub fn validate(&self) -> ConfigResult<()> {
        if self.ttl_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "ttl_seconds",
                self.ttl_seconds,
                "TTL must be greater than zero",
            ));
        }
        if self.max_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "max_size",
                self.max_size,
                "cache must hold at least one entry",
            ));
        }
        if self.failure_threshold == 0 {
            return Err(ConfigurationError::invalid_value(
                "failure_threshold",
                self.failure_threshold,
                "at least one failed probe must be required to degrade",
            ));
        }

        for (field, value) in [
            (
                "recovery_check_interval_seconds",
                self.recovery_check_interval_seconds,
            ),
            (
                "alert_check_interval_seconds",
                self.alert_check_interval_seconds,
            ),
            ("local_inference_timeout_ms", self.local_inference_timeout_ms),
            ("cloud_timeout_ms", self.cloud_timeout_ms),
            ("cache_operation_timeout_ms", self.cache_operation_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigurationError::invalid_value(
                    field,
                    value,
                    "must be greater than zero",
                ));
            }
        }

        if self.cloud_timeout_ms < self.local_inference_timeout_ms {
            return Err(ConfigurationError::invalid_value(
                "cloud_timeout_ms",
                self.cloud_timeout_ms,
                format!(
                    "must not be shorter than local_inference_timeout_ms ({})",
                    self.local_inference_timeout_ms
                ),
            ));
        }

        for (field, value) in [
            ("hit_rate_target", self.hit_rate_target),
            ("alert_hit_rate_threshold", self.alert_hit_rate_threshold),
            ("alert_error_rate_threshold", self.alert_error_rate_threshold),
            ("size_utilization_limit", self.size_utilization_limit),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigurationError::invalid_value(
                    field,
                    value,
                    "must be within [0.0, 1.0]",
                ));
            }
        }

        for (field, value) in [
            ("eviction_sample_size", self.eviction_sample_size),
            ("eviction_batch_size", self.eviction_batch_size),
            ("scan_count", self.scan_count),
            ("latency_window", self.latency_window),
        ] {
            if value == 0 {
                return Err(ConfigurationError::invalid_value(
                    field,
                    value,
                    "must be greater than zero",
                ));
            }
        }

        if self.key_prefix.is_empty() {
            return Err(ConfigurationError::invalid_value(
                "key_prefix",
                "",
                "a namespace prefix is required",
            ));
        }

        Ok(())
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn recovery_check_interval(&self) -> Duration {
        Duration::from_secs(self.recovery_check_interval_seconds)
    }

    pub fn alert_check_interval(&self) -> Duration {
        Duration::from_secs(self.alert_check_interval_seconds)
    }

    pub fn local_inference_timeout(&self) -> Duration {
        Duration::from_millis(self.local_inference_timeout_ms)
    }

    pub fn cloud_timeout(&self) -> Duration {
        Duration::from_millis(self.cloud_timeout_ms)
    }

    pub fn cache_operation_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_operation_timeout_ms)
    }

    /// SCAN pattern matching every key in this namespace
    pub fn key_pattern(&self) -> String {
        format!("{}*", self.key_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_surface() {
        let config = DecisionServiceConfig::default();
        assert_eq!(config.ttl_seconds, 5);
        assert_eq!(config.max_size, 10_000);
        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.recovery_check_interval_seconds, 10);
        assert_eq!(config.hit_rate_target, 0.8);
        assert_eq!(config.alert_hit_rate_threshold, 0.5);
        assert_eq!(config.alert_error_rate_threshold, 0.1);
        assert_eq!(config.alert_check_interval_seconds, 60);
        assert_eq!(config.local_inference_timeout_ms, 20);
        assert_eq!(config.key_prefix, "decision:");
        assert!(config.warmup_seeds.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config = DecisionServiceConfig {
            ttl_seconds: 0,
            ..DecisionServiceConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.field(), Some("ttl_seconds"));
    }

    #[test]
    fn test_rates_must_be_fractions() {
        let config = DecisionServiceConfig {
            alert_error_rate_threshold: 1.5,
            ..DecisionServiceConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.field(), Some("alert_error_rate_threshold"));
    }

    #[test]
    fn test_cloud_timeout_not_shorter_than_local() {
        let config = DecisionServiceConfig {
            local_inference_timeout_ms: 50,
            cloud_timeout_ms: 10,
            ..DecisionServiceConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.field(), Some("cloud_timeout_ms"));
    }

    #[test]
    fn test_empty_prefix_rejected() {
        let config = DecisionServiceConfig {
            key_prefix: String::new(),
            ..DecisionServiceConfig::default()
        };
        assert_eq!(config.validate().unwrap_err().field(), Some("key_prefix"));
    }

    #[test]
    fn test_key_pattern() {
        let config = DecisionServiceConfig::default();
        assert_eq!(config.key_pattern(), "decision:*");
        assert_eq!(config.ttl(), Duration::from_secs(5));
        assert_eq!(config.local_inference_timeout(), Duration::from_millis(20));
    }
}
