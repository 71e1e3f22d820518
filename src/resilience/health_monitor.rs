//! # Health Monitor
//!
//! Background loop that probes the local compute path every
//! `recovery_check_interval` and feeds the results to the [`ModeController`].
//!
//! A probe succeeds when the backend answers and its latency is under
//! `local_inference_timeout`. A successful probe while DEGRADED triggers a
//! recovery attempt right away instead of waiting for the next tick.
//!
//! The loop listens on a `watch` stop channel during its sleep and checks it
//! again before each probe, so shutdown never waits for a full interval and no
//! probe starts after the stop signal.

use super::mode_controller::{ModeController, ModeTransition};
use crate::compute::{compute_with_deadline, ComputeBackend};
use crate::config::DecisionServiceConfig;
use crate::constants::{OperatingMode, HEALTH_PROBE_SYMBOL};
use crate::error::Result;
use crate::models::RequestContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

/// One probe result; consumed immediately, never retained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSample {
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub latency: Duration,
    pub error: Option<String>,
}

impl HealthSample {
    pub fn new(success: bool, latency: Duration, error: Option<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            success,
            latency,
            error,
        }
    }
}

/// What a single health tick did
#[derive(Debug, Clone)]
pub struct HealthCheckOutcome {
    pub sample: HealthSample,
    pub degraded: Option<ModeTransition>,
    pub recovered: bool,
}

#[derive(Debug)]
pub struct HealthMonitor {
    backend: Arc<dyn ComputeBackend>,
    controller: Arc<ModeController>,
    interval: Duration,
    probe_timeout: Duration,
    probe_context: RequestContext,
}

impl HealthMonitor {
    pub fn new(
        backend: Arc<dyn ComputeBackend>,
        controller: Arc<ModeController>,
        config: &DecisionServiceConfig,
    ) -> Result<Self> {
        Ok(Self {
            backend,
            controller,
            interval: config.recovery_check_interval(),
            probe_timeout: config.local_inference_timeout(),
            probe_context: RequestContext::new(HEALTH_PROBE_SYMBOL)?,
        })
    }

    /// Issue one probe against the local backend
    pub async fn probe(&self) -> HealthSample {
        let started = Instant::now();
        let result =
            compute_with_deadline(&self.backend, &self.probe_context, self.probe_timeout).await;
        let latency = started.elapsed();

        match result {
            Ok(_) if latency < self.probe_timeout => HealthSample::new(true, latency, None),
            Ok(_) => HealthSample::new(
                false,
                latency,
                Some(format!(
                    "probe took {}ms, limit {}ms",
                    latency.as_millis(),
                    self.probe_timeout.as_millis()
                )),
            ),
            Err(e) => HealthSample::new(false, latency, Some(e.to_string())),
        }
    }

    /// One tick: probe, update counters, and recover immediately if possible
    pub async fn run_once(&self) -> HealthCheckOutcome {
        let sample = self.probe().await;
        let degraded = self.controller.record_probe(&sample).await;

        let recovered = if sample.success && self.controller.mode() == OperatingMode::Degraded {
            self.controller.attempt_recovery(|| self.probe()).await
        } else {
            false
        };

        debug!(
            success = sample.success,
            latency_ms = sample.latency.as_millis() as u64,
            mode = %self.controller.mode(),
            "Health check tick"
        );

        HealthCheckOutcome {
            sample,
            degraded,
            recovered,
        }
    }

    /// Spawn the background loop; it exits when `shutdown` flips to true
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        info!(
            interval_seconds = self.interval.as_secs(),
            probe_timeout_ms = self.probe_timeout.as_millis() as u64,
            backend = %self.backend.name(),
            "🩺 Starting health monitor"
        );

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(self.interval) => {}
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
                self.run_once().await;
            }
            info!("Health monitor stopped");
        })
    }
}
