//! # System Constants
//!
//! Core enums and names that define the operational vocabulary of the
//! decision-serving core: operating modes, decision provenance, risk tags,
//! alert severities and alert rule names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Alert rule names raised by the metrics monitor and the mode controller
pub mod rules {
    pub const LOW_HIT_RATE: &str = "low_hit_rate";
    pub const HIGH_ERROR_RATE: &str = "high_error_rate";
    pub const UNHEALTHY: &str = "unhealthy";
    pub const CONSECUTIVE_HEALTH_FAILURES: &str = "consecutive_health_failures";
    pub const RECOVERY_PROBE_SUCCEEDED: &str = "recovery_probe_succeeded";
    pub const MANUAL_OFFLINE: &str = "manual_offline";
    pub const MANUAL_RESTORE: &str = "manual_restore";
}

/// Symbol used for synthetic health and recovery probes
pub const HEALTH_PROBE_SYMBOL: &str = "__health_probe__";

/// Process-wide operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperatingMode {
    /// Local compute is healthy and used for every miss
    Normal = 0,
    /// Health probes crossed the failure threshold; no local compute
    Degraded = 1,
    /// Administratively taken offline; no local compute, no automatic recovery
    Offline = 2,
}

impl OperatingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingMode::Normal => "NORMAL",
            OperatingMode::Degraded => "DEGRADED",
            OperatingMode::Offline => "OFFLINE",
        }
    }

    /// Whether misses may be computed on the local path
    pub fn allows_local_compute(&self) -> bool {
        matches!(self, OperatingMode::Normal)
    }
}

impl From<u8> for OperatingMode {
    fn from(value: u8) -> Self {
        match value {
            0 => OperatingMode::Normal,
            1 => OperatingMode::Degraded,
            _ => OperatingMode::Offline,
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which path produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    Normal,
    Degraded,
    Offline,
    Fallback,
    Cache,
    Warmup,
}

impl SourceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceMode::Normal => "normal",
            SourceMode::Degraded => "degraded",
            SourceMode::Offline => "offline",
            SourceMode::Fallback => "fallback",
            SourceMode::Cache => "cache",
            SourceMode::Warmup => "warmup",
        }
    }
}

impl From<OperatingMode> for SourceMode {
    fn from(mode: OperatingMode) -> Self {
        match mode {
            OperatingMode::Normal => SourceMode::Normal,
            OperatingMode::Degraded => SourceMode::Degraded,
            OperatingMode::Offline => SourceMode::Offline,
        }
    }
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

/// Alert severity, ordered from least to most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Info,
    Warning,
    High,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "INFO",
            AlertSeverity::Warning => "WARNING",
            AlertSeverity::High => "HIGH",
            AlertSeverity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_round_trips_through_u8() {
        for mode in [
            OperatingMode::Normal,
            OperatingMode::Degraded,
            OperatingMode::Offline,
        ] {
            assert_eq!(OperatingMode::from(mode as u8), mode);
        }
        assert_eq!(OperatingMode::from(42), OperatingMode::Offline);
    }

    #[test]
    fn test_only_normal_allows_local_compute() {
        assert!(OperatingMode::Normal.allows_local_compute());
        assert!(!OperatingMode::Degraded.allows_local_compute());
        assert!(!OperatingMode::Offline.allows_local_compute());
    }

    #[test]
    fn test_serialized_names() {
        assert_eq!(
            serde_json::to_string(&OperatingMode::Degraded).unwrap(),
            "\"DEGRADED\""
        );
        assert_eq!(
            serde_json::to_string(&SourceMode::Fallback).unwrap(),
            "\"fallback\""
        );
        assert_eq!(
            serde_json::to_string(&AlertSeverity::Critical).unwrap(),
            "\"CRITICAL\""
        );
    }

    #[test]
    fn test_severity_ordering() {
        assert!(AlertSeverity::Critical > AlertSeverity::High);
        assert!(AlertSeverity::High > AlertSeverity::Warning);
    }
}
