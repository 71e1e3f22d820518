//! # Alert Monitor
//!
//! Periodically turns the counter registry into an [`AlertReport`] and hands
//! alerts to the sink, rate limited to one publication per
//! `alert_check_interval`.
//!
//! Rules:
//! - `low_hit_rate`: hit rate below `alert_hit_rate_threshold` (only once lookups exist)
//! - `high_error_rate`: error rate above `alert_error_rate_threshold`; escalates to CRITICAL
//! - `unhealthy`: the cache's composite health check failed

use super::DecisionMetrics;
use crate::cache::DecisionCache;
use crate::config::DecisionServiceConfig;
use crate::constants::{rules, AlertSeverity};
use crate::events::{publish_or_log, AlertSink};
use crate::models::{AlertEvent, AlertReport, AlertSource, TriggeredRule};
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Debug)]
pub struct AlertMonitor {
    metrics: Arc<DecisionMetrics>,
    cache: Arc<DecisionCache>,
    sink: Arc<dyn AlertSink>,
    hit_rate_threshold: f64,
    error_rate_threshold: f64,
    check_interval: Duration,
    last_alert: Mutex<Option<Instant>>,
    /// Alerts this monitor published; mode alerts only reach the shared registry
    published: AtomicU64,
}

impl AlertMonitor {
    pub fn new(
        metrics: Arc<DecisionMetrics>,
        cache: Arc<DecisionCache>,
        sink: Arc<dyn AlertSink>,
        config: &DecisionServiceConfig,
    ) -> Self {
        Self {
            metrics,
            cache,
            sink,
            hit_rate_threshold: config.alert_hit_rate_threshold,
            error_rate_threshold: config.alert_error_rate_threshold,
            check_interval: config.alert_check_interval(),
            last_alert: Mutex::new(None),
            published: AtomicU64::new(0),
        }
    }

    /// Number of alerts published by [`Self::check_alerts`]
    pub fn alert_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Evaluate every rule and publish an alert unless rate limited.
    ///
    /// The report is returned whether or not publication was suppressed.
    pub async fn check_alerts(&self) -> AlertReport {
        let snapshot = self.metrics.snapshot();
        let mut triggered = Vec::new();

        if snapshot.lookups() > 0 && snapshot.hit_rate < self.hit_rate_threshold {
            triggered.push(TriggeredRule::new(
                rules::LOW_HIT_RATE,
                snapshot.hit_rate,
                self.hit_rate_threshold,
            ));
        }

        let high_error_rate = snapshot.error_rate > self.error_rate_threshold;
        if high_error_rate {
            triggered.push(TriggeredRule::new(
                rules::HIGH_ERROR_RATE,
                snapshot.error_rate,
                self.error_rate_threshold,
            ));
        }

        let health = self.cache.health_report().await;
        if !health.healthy {
            triggered.push(TriggeredRule::new(
                rules::UNHEALTHY,
                health.issues.len() as f64,
                0.0,
            ));
        }

        let severity = match (triggered.is_empty(), high_error_rate) {
            (true, _) => None,
            (false, true) => Some(AlertSeverity::Critical),
            (false, false) => Some(AlertSeverity::Warning),
        };

        let mut report = AlertReport {
            severity,
            rules: triggered,
            hit_rate: snapshot.hit_rate,
            error_rate: snapshot.error_rate,
            published: false,
            suppressed: false,
            timestamp: Utc::now(),
        };

        let Some(severity) = severity else {
            debug!(
                hit_rate = snapshot.hit_rate,
                error_rate = snapshot.error_rate,
                "Alert check clean"
            );
            return report;
        };

        if !self.try_claim_alert_slot() {
            debug!(
                rules = report.rules.len(),
                "Alert suppressed by rate limit"
            );
            report.suppressed = true;
            return report;
        }

        let mut message = format!(
            "Decision cache alert: hit_rate={:.3} error_rate={:.3}",
            snapshot.hit_rate, snapshot.error_rate
        );
        if !health.issues.is_empty() {
            message.push_str(&format!(" ({})", health.issues.join("; ")));
        }

        let event = AlertEvent::new(
            severity,
            AlertSource::MetricsMonitor,
            message,
            report.rules.clone(),
        );
        if publish_or_log(&self.sink, event).await {
            self.published.fetch_add(1, Ordering::Relaxed);
            self.metrics.record_alert_published();
            report.published = true;
        }
        crate::logging::log_alert(severity, &report.rules, report.published);

        report
    }

    /// Take the publication slot if the interval since the last alert elapsed
    fn try_claim_alert_slot(&self) -> bool {
        let now = Instant::now();
        let mut last = self.last_alert.lock();
        let allowed = last.map_or(true, |at| now.duration_since(at) >= self.check_interval);
        if allowed {
            *last = Some(now);
        }
        allowed
    }

    /// Spawn the periodic evaluation loop; it exits when `shutdown` flips to true
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        info!(
            interval_seconds = self.check_interval.as_secs(),
            "Starting alert monitor"
        );

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(self.check_interval) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                        continue;
                    }
                }
                if *shutdown.borrow() {
                    break;
                }
                self.check_alerts().await;
            }
            info!("Alert monitor stopped");
        })
    }
}
