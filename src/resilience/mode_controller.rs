//! # Mode Controller
//!
//! Failover state machine over [`OperatingMode`].
//!
//! ```text
//!   NORMAL ──(consecutive_failures >= threshold)──▶ DEGRADED
//!   DEGRADED ──(recovery probe succeeds)──▶ NORMAL
//!   any ──(enter_offline)──▶ OFFLINE ──(restore_from_offline)──▶ DEGRADED
//! ```
//!
//! The mode is an `AtomicU8` so request-path reads never block and never see a
//! torn value. Every write happens while holding the `state` mutex, which
//! serializes transitions and keeps the failure counters consistent with the
//! mode. Alerts are published after the lock is released.

use super::health_monitor::HealthSample;
use crate::config::DecisionServiceConfig;
use crate::constants::{rules, AlertSeverity, OperatingMode};
use crate::events::{publish_or_log, AlertSink};
use crate::metrics::DecisionMetrics;
use crate::models::{AlertEvent, AlertSource, TriggeredRule};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const TRANSITION_HISTORY_LIMIT: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeTransition {
    pub from: OperatingMode,
    pub to: OperatingMode,
    pub reason: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureCounters {
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
}

#[derive(Debug, Default)]
struct ControllerState {
    counters: FailureCounters,
    history: VecDeque<ModeTransition>,
}

#[derive(Debug)]
pub struct ModeController {
    mode: AtomicU8,
    state: Mutex<ControllerState>,
    /// Serializes recovery attempts so only one probe is in flight
    recovery_lock: tokio::sync::Mutex<()>,
    sink: Arc<dyn AlertSink>,
    metrics: Arc<DecisionMetrics>,
    failure_threshold: u32,
    probe_timeout: Duration,
}

impl ModeController {
    pub fn new(
        sink: Arc<dyn AlertSink>,
        metrics: Arc<DecisionMetrics>,
        config: &DecisionServiceConfig,
    ) -> Self {
        Self {
            mode: AtomicU8::new(OperatingMode::Normal as u8),
            state: Mutex::new(ControllerState::default()),
            recovery_lock: tokio::sync::Mutex::new(()),
            sink,
            metrics,
            failure_threshold: config.failure_threshold,
            probe_timeout: config.local_inference_timeout(),
        }
    }

    /// Current mode; lock-free
    pub fn mode(&self) -> OperatingMode {
        OperatingMode::from(self.mode.load(Ordering::Acquire))
    }

    pub fn counters(&self) -> FailureCounters {
        self.state.lock().counters
    }

    /// Most recent transitions, oldest first
    pub fn history(&self) -> Vec<ModeTransition> {
        self.state.lock().history.iter().cloned().collect()
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// Fold one health probe result into the counters.
    ///
    /// Returns the NORMAL → DEGRADED transition when this sample crosses the
    /// failure threshold. Further failures while already degraded only count.
    pub async fn record_probe(&self, sample: &HealthSample) -> Option<ModeTransition> {
        if sample.success {
            let mut state = self.state.lock();
            state.counters.consecutive_successes += 1;
            if self.mode() == OperatingMode::Normal {
                state.counters.consecutive_failures = 0;
            }
            return None;
        }

        self.metrics.record_health_check_failure();

        let (transition, failures) = {
            let mut state = self.state.lock();
            state.counters.consecutive_failures += 1;
            state.counters.consecutive_successes = 0;
            let failures = state.counters.consecutive_failures;

            let transition = (failures >= self.failure_threshold
                && self.mode() == OperatingMode::Normal)
                .then(|| {
                    self.transition_locked(
                        &mut state,
                        OperatingMode::Degraded,
                        format!(
                            "{failures} consecutive health check failures (threshold {})",
                            self.failure_threshold
                        ),
                    )
                });
            (transition, failures)
        };

        debug!(
            consecutive_failures = failures,
            threshold = self.failure_threshold,
            error = sample.error.as_deref().unwrap_or("slow response"),
            "Health probe failed"
        );

        if let Some(transition) = &transition {
            self.publish(
                AlertSeverity::Critical,
                format!("Entered DEGRADED mode: {}", transition.reason),
                TriggeredRule::new(
                    rules::CONSECUTIVE_HEALTH_FAILURES,
                    failures as f64,
                    self.failure_threshold as f64,
                ),
            )
            .await;
        }

        transition
    }

    /// Try to return from DEGRADED to NORMAL using `probe`.
    ///
    /// Only runs while DEGRADED (OFFLINE never recovers on its own). On a
    /// successful probe the failure counter resets and the mode becomes
    /// NORMAL; on failure the mode stays DEGRADED.
    pub async fn attempt_recovery<F, Fut>(&self, probe: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = HealthSample>,
    {
        let _recovery = self.recovery_lock.lock().await;

        if self.mode() != OperatingMode::Degraded {
            return false;
        }

        let sample = probe().await;

        if !sample.success {
            self.metrics.record_health_check_failure();
            let mut state = self.state.lock();
            state.counters.consecutive_failures += 1;
            state.counters.consecutive_successes = 0;
            warn!(
                consecutive_failures = state.counters.consecutive_failures,
                error = sample.error.as_deref().unwrap_or("slow response"),
                "🟡 Recovery probe failed, staying DEGRADED"
            );
            return false;
        }

        let transition = {
            let mut state = self.state.lock();
            // an administrative OFFLINE may have landed while the probe ran
            if self.mode() != OperatingMode::Degraded {
                return false;
            }
            state.counters.consecutive_failures = 0;
            state.counters.consecutive_successes += 1;
            self.transition_locked(
                &mut state,
                OperatingMode::Normal,
                format!(
                    "recovery probe succeeded in {:.1}ms",
                    sample.latency.as_secs_f64() * 1_000.0
                ),
            )
        };

        self.publish(
            AlertSeverity::High,
            format!("Recovered to NORMAL mode: {}", transition.reason),
            TriggeredRule::new(
                rules::RECOVERY_PROBE_SUCCEEDED,
                sample.latency.as_secs_f64() * 1_000.0,
                self.probe_timeout.as_secs_f64() * 1_000.0,
            ),
        )
        .await;

        true
    }

    /// Administratively take the service offline
    pub async fn enter_offline(&self, reason: impl Into<String>) -> Option<ModeTransition> {
        let reason = reason.into();
        let transition = {
            let mut state = self.state.lock();
            if self.mode() == OperatingMode::Offline {
                return None;
            }
            self.transition_locked(&mut state, OperatingMode::Offline, reason)
        };

        self.publish(
            AlertSeverity::Critical,
            format!("Entered OFFLINE mode: {}", transition.reason),
            TriggeredRule::new(rules::MANUAL_OFFLINE, 1.0, 0.0),
        )
        .await;
        Some(transition)
    }

    /// Leave OFFLINE into DEGRADED, from where health-gated recovery applies
    pub async fn restore_from_offline(&self) -> Option<ModeTransition> {
        let transition = {
            let mut state = self.state.lock();
            if self.mode() != OperatingMode::Offline {
                return None;
            }
            state.counters = FailureCounters::default();
            self.transition_locked(
                &mut state,
                OperatingMode::Degraded,
                "restored from OFFLINE by operator".to_string(),
            )
        };

        self.publish(
            AlertSeverity::Warning,
            format!("Left OFFLINE mode: {}", transition.reason),
            TriggeredRule::new(rules::MANUAL_RESTORE, 1.0, 0.0),
        )
        .await;
        Some(transition)
    }

    /// Caller must hold `state`
    fn transition_locked(
        &self,
        state: &mut ControllerState,
        to: OperatingMode,
        reason: String,
    ) -> ModeTransition {
        let from = self.mode();
        self.mode.store(to as u8, Ordering::Release);

        let transition = ModeTransition {
            from,
            to,
            reason,
            at: Utc::now(),
        };
        if state.history.len() == TRANSITION_HISTORY_LIMIT {
            state.history.pop_front();
        }
        state.history.push_back(transition.clone());

        self.metrics.record_mode_transition(to);
        crate::logging::log_mode_transition(from, to, &transition.reason);

        transition
    }

    async fn publish(&self, severity: AlertSeverity, message: String, rule: TriggeredRule) {
        let event = AlertEvent::new(severity, AlertSource::ModeController, message, vec![rule]);
        if publish_or_log(&self.sink, event).await {
            self.metrics.record_alert_published();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DecisionError, Result};
    use async_trait::async_trait;

    #[derive(Debug, Default)]
    struct RecordingSink {
        events: Mutex<Vec<AlertEvent>>,
        fail: bool,
    }

    #[async_trait]
    impl AlertSink for RecordingSink {
        async fn publish(&self, event: AlertEvent) -> Result<()> {
            if self.fail {
                return Err(DecisionError::AlertPublish("sink down".to_string()));
            }
            self.events.lock().push(event);
            Ok(())
        }
    }

    fn controller(sink: Arc<RecordingSink>) -> ModeController {
        ModeController::new(
            sink,
            Arc::new(DecisionMetrics::default()),
            &DecisionServiceConfig::default(),
        )
    }

    fn ok() -> HealthSample {
        HealthSample::new(true, Duration::from_millis(5), None)
    }

    fn failed() -> HealthSample {
        HealthSample::new(false, Duration::from_millis(20), Some("timeout".to_string()))
    }

    #[tokio::test]
    async fn test_degrades_exactly_once_per_crossing() {
        let sink = Arc::new(RecordingSink::default());
        let controller = controller(sink.clone());

        assert!(controller.record_probe(&failed()).await.is_none());
        assert!(controller.record_probe(&failed()).await.is_none());
        let transition = controller.record_probe(&failed()).await.expect("crossed threshold");
        assert_eq!(transition.from, OperatingMode::Normal);
        assert_eq!(transition.to, OperatingMode::Degraded);

        // further failures while degraded are counted but do not re-alert
        assert!(controller.record_probe(&failed()).await.is_none());
        assert_eq!(controller.counters().consecutive_failures, 4);
        assert_eq!(controller.mode(), OperatingMode::Degraded);

        let events = sink.events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].severity, AlertSeverity::Critical);
        assert_eq!(events[0].rules[0].name, rules::CONSECUTIVE_HEALTH_FAILURES);
    }

    #[tokio::test]
    async fn test_success_resets_failures_in_normal() {
        let controller = controller(Arc::new(RecordingSink::default()));
        controller.record_probe(&failed()).await;
        controller.record_probe(&failed()).await;
        controller.record_probe(&ok()).await;
        controller.record_probe(&failed()).await;
        controller.record_probe(&failed()).await;
        assert_eq!(controller.mode(), OperatingMode::Normal);
        assert_eq!(controller.counters().consecutive_failures, 2);
    }

    #[tokio::test]
    async fn test_successful_recovery_resets_and_alerts_high() {
        let sink = Arc::new(RecordingSink::default());
        let controller = controller(sink.clone());
        for _ in 0..3 {
            controller.record_probe(&failed()).await;
        }

        assert!(controller.attempt_recovery(|| async { ok() }).await);
        assert_eq!(controller.mode(), OperatingMode::Normal);
        assert_eq!(controller.counters().consecutive_failures, 0);

        let events = sink.events.lock();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].severity, AlertSeverity::High);
    }

    #[tokio::test]
    async fn test_failed_recovery_stays_degraded() {
        let controller = controller(Arc::new(RecordingSink::default()));
        for _ in 0..3 {
            controller.record_probe(&failed()).await;
        }
        assert!(!controller.attempt_recovery(|| async { failed() }).await);
        assert_eq!(controller.mode(), OperatingMode::Degraded);
        assert_eq!(controller.counters().consecutive_failures, 4);
    }

    #[tokio::test]
    async fn test_recovery_is_noop_outside_degraded() {
        let controller = controller(Arc::new(RecordingSink::default()));
        assert!(!controller.attempt_recovery(|| async { ok() }).await);

        controller.enter_offline("maintenance").await;
        assert!(!controller.attempt_recovery(|| async { ok() }).await);
        assert_eq!(controller.mode(), OperatingMode::Offline);
    }

    #[tokio::test]
    async fn test_offline_is_not_left_by_health_probes() {
        let controller = controller(Arc::new(RecordingSink::default()));
        controller.enter_offline("maintenance").await;
        assert!(controller.enter_offline("again").await.is_none());

        for _ in 0..5 {
            assert!(controller.record_probe(&failed()).await.is_none());
        }
        controller.record_probe(&ok()).await;
        assert_eq!(controller.mode(), OperatingMode::Offline);

        let restored = controller.restore_from_offline().await.unwrap();
        assert_eq!(restored.to, OperatingMode::Degraded);
        assert!(controller.attempt_recovery(|| async { ok() }).await);
        assert_eq!(controller.mode(), OperatingMode::Normal);

        let history: Vec<_> = controller.history().iter().map(|t| t.to).collect();
        assert_eq!(
            history,
            vec![
                OperatingMode::Offline,
                OperatingMode::Degraded,
                OperatingMode::Normal
            ]
        );
    }

    #[tokio::test]
    async fn test_sink_failure_is_swallowed() {
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..RecordingSink::default()
        });
        let controller = controller(sink);
        for _ in 0..3 {
            controller.record_probe(&failed()).await;
        }
        assert_eq!(controller.mode(), OperatingMode::Degraded);
    }

    #[tokio::test]
    async fn test_health_failures_counted_in_metrics() {
        let metrics = Arc::new(DecisionMetrics::default());
        let controller = ModeController::new(
            Arc::new(RecordingSink::default()),
            metrics.clone(),
            &DecisionServiceConfig::default(),
        );
        controller.record_probe(&failed()).await;
        controller.record_probe(&ok()).await;
        assert_eq!(metrics.snapshot().health_check_failures, 1);
    }
}
