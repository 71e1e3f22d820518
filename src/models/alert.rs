//! Alert events and monitor reports.

use crate::constants::AlertSeverity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single rule that fired, with the value that tripped it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeredRule {
    pub name: String,
    pub measured: f64,
    pub threshold: f64,
}

impl TriggeredRule {
    pub fn new(name: impl Into<String>, measured: f64, threshold: f64) -> Self {
        Self {
            name: name.into(),
            measured,
            threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSource {
    MetricsMonitor,
    ModeController,
}

/// Structured alert forwarded to an [`AlertSink`](crate::events::AlertSink)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub id: Uuid,
    pub severity: AlertSeverity,
    pub source: AlertSource,
    pub message: String,
    pub rules: Vec<TriggeredRule>,
    pub timestamp: DateTime<Utc>,
}

impl AlertEvent {
    pub fn new(
        severity: AlertSeverity,
        source: AlertSource,
        message: impl Into<String>,
        rules: Vec<TriggeredRule>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            severity,
            source,
            message: message.into(),
            rules,
            timestamp: Utc::now(),
        }
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name.as_str()).collect()
    }
}

/// Result of one metrics monitor evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertReport {
    /// `None` when no rule fired
    pub severity: Option<AlertSeverity>,
    pub rules: Vec<TriggeredRule>,
    pub hit_rate: f64,
    pub error_rate: f64,
    /// An alert was handed to the sink on this evaluation
    pub published: bool,
    /// Rules fired but publication was rate limited
    pub suppressed: bool,
    pub timestamp: DateTime<Utc>,
}

impl AlertReport {
    pub fn has_alerts(&self) -> bool {
        !self.rules.is_empty()
    }

    pub fn rule(&self, name: &str) -> Option<&TriggeredRule> {
        self.rules.iter().find(|r| r.name == name)
    }
}
