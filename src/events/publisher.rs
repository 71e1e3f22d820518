use crate::constants::AlertSeverity;
use crate::error::Result;
use crate::models::AlertEvent;
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Destination for structured alerts
#[async_trait]
pub trait AlertSink: Send + Sync + std::fmt::Debug {
    async fn publish(&self, event: AlertEvent) -> Result<()>;
}

/// In-process fan-out of alerts to any number of subscribers
#[derive(Debug, Clone)]
pub struct BroadcastAlertSink {
    sender: broadcast::Sender<AlertEvent>,
}

impl BroadcastAlertSink {
    /// Create a new sink with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastAlertSink {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl AlertSink for BroadcastAlertSink {
    async fn publish(&self, event: AlertEvent) -> Result<()> {
        // No subscribers is fine: alerts are published whether or not anyone listens
        let _ = self.sender.send(event);
        Ok(())
    }
}

/// Writes alerts to the tracing subscriber at a level matching their severity
#[derive(Debug, Clone, Default)]
pub struct TracingAlertSink;

#[async_trait]
impl AlertSink for TracingAlertSink {
    async fn publish(&self, event: AlertEvent) -> Result<()> {
        let rules = event.rule_names().join(",");
        match event.severity {
            AlertSeverity::Critical => error!(
                alert_id = %event.id,
                severity = %event.severity,
                rules = %rules,
                "🚨 ALERT: {}", event.message
            ),
            AlertSeverity::High | AlertSeverity::Warning => warn!(
                alert_id = %event.id,
                severity = %event.severity,
                rules = %rules,
                "⚠️ ALERT: {}", event.message
            ),
            AlertSeverity::Info => info!(
                alert_id = %event.id,
                severity = %event.severity,
                rules = %rules,
                "ALERT: {}", event.message
            ),
        }
        Ok(())
    }
}
