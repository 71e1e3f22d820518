//! # Alert Transport
//!
//! The [`AlertSink`] boundary and the sinks shipped with the core. Publishing
//! is fire-and-forget from the caller's point of view: callers log a failed
//! publish and carry on.

pub mod publisher;

pub use publisher::{AlertSink, BroadcastAlertSink, TracingAlertSink};

use crate::models::AlertEvent;
use std::sync::Arc;
use tracing::warn;

/// Publish `event`, logging and swallowing any sink failure.
///
/// Returns whether the sink accepted the event.
pub async fn publish_or_log(sink: &Arc<dyn AlertSink>, event: AlertEvent) -> bool {
    let alert_id = event.id;
    let severity = event.severity;
    match sink.publish(event).await {
        Ok(()) => true,
        Err(e) => {
            warn!(
                alert_id = %alert_id,
                severity = %severity,
                error = %e,
                "Alert publish failed, dropping alert"
            );
            false
        }
    }
}
