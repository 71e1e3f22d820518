//! # Decision Service
//!
//! Public entry point. Answers one request end to end:
//! fingerprint → cache GET → (hit: return) | (miss: compute → cache SET → return).
//!
//! Every request gets a response. Cache failures fall open to compute; compute
//! timeouts and failures become a fallback [`Decision`] (HOLD, confidence 0,
//! risk HIGH) that is never cached.
//!
//! Compute path by mode:
//! - NORMAL: local backend under `local_inference_timeout`
//! - DEGRADED / OFFLINE: the remote backend under `cloud_timeout` when one is
//!   configured, otherwise an immediate fallback
//!
//! Background work (health probe loop, alert loop) runs only between
//! [`DecisionService::start`] and [`DecisionService::shutdown`].

use crate::cache::{CacheHealthReport, CacheStore, DecisionCache};
use crate::compute::{compute_with_deadline, ComputeBackend};
use crate::config::DecisionServiceConfig;
use crate::constants::{OperatingMode, SourceMode};
use crate::error::{DecisionError, Result};
use crate::events::AlertSink;
use crate::logging::log_cache_operation;
use crate::metrics::{AlertMonitor, DecisionMetrics, MetricsSnapshot};
use crate::models::{AlertReport, Decision, RequestContext};
use crate::resilience::{
    FailureCounters, HealthCheckOutcome, HealthMonitor, ModeController, ModeTransition,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// What a caller gets back for every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResponse {
    pub decision: Decision,
    pub cache_hit: bool,
    pub mode: OperatingMode,
    pub total_latency_ms: f64,
    pub fingerprint: String,
}

/// Operator view of the running service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub mode: OperatingMode,
    pub accepting_requests: bool,
    pub background_tasks: usize,
    pub counters: FailureCounters,
    pub metrics: MetricsSnapshot,
    pub cache: CacheHealthReport,
    pub recent_transitions: Vec<ModeTransition>,
}

#[derive(Debug)]
pub struct DecisionService {
    config: DecisionServiceConfig,
    metrics: Arc<DecisionMetrics>,
    cache: Arc<DecisionCache>,
    controller: Arc<ModeController>,
    health: Arc<HealthMonitor>,
    alerts: Arc<AlertMonitor>,
    primary: Arc<dyn ComputeBackend>,
    remote: Option<Arc<dyn ComputeBackend>>,
    accepting: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl DecisionService {
    /// Build the service. Invalid configuration is the only construction failure.
    pub fn new(
        config: DecisionServiceConfig,
        store: Arc<dyn CacheStore>,
        primary: Arc<dyn ComputeBackend>,
        sink: Arc<dyn AlertSink>,
    ) -> Result<Self> {
        config.validate()?;

        let metrics = Arc::new(DecisionMetrics::new(config.latency_window));
        let cache = Arc::new(DecisionCache::new(store, metrics.clone(), &config)?);
        let controller = Arc::new(ModeController::new(sink.clone(), metrics.clone(), &config));
        let health = Arc::new(HealthMonitor::new(
            primary.clone(),
            controller.clone(),
            &config,
        )?);
        let alerts = Arc::new(AlertMonitor::new(
            metrics.clone(),
            cache.clone(),
            sink,
            &config,
        ));
        let (shutdown_tx, _) = watch::channel(false);

        info!(
            store = %cache.store_name(),
            backend = %primary.name(),
            ttl_seconds = config.ttl_seconds,
            max_size = config.max_size,
            failure_threshold = config.failure_threshold,
            "✅ Decision service initialized"
        );

        Ok(Self {
            config,
            metrics,
            cache,
            controller,
            health,
            alerts,
            primary,
            remote: None,
            accepting: AtomicBool::new(true),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Attach the remote compute path used while DEGRADED or OFFLINE
    pub fn with_remote_backend(mut self, remote: Arc<dyn ComputeBackend>) -> Self {
        info!(backend = %remote.name(), "Remote compute path configured");
        self.remote = Some(remote);
        self
    }

    pub fn config(&self) -> &DecisionServiceConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<DecisionCache> {
        &self.cache
    }

    pub fn mode_controller(&self) -> &Arc<ModeController> {
        &self.controller
    }

    pub fn mode(&self) -> OperatingMode {
        self.controller.mode()
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Answer one request. Never fails.
    pub async fn decide(&self, context: &RequestContext) -> DecisionResponse {
        let started = Instant::now();
        let fingerprint = self.cache.fingerprint(context);
        let mode = self.controller.mode();

        if !self.is_accepting() {
            self.metrics.record_fallback();
            let decision = Decision::fallback("service is shut down", SourceMode::Offline);
            return self.respond(decision, false, mode, fingerprint, started);
        }

        if let Some(cached) = self.cache.get(context).await {
            log_cache_operation(
                "GET",
                Some(&fingerprint),
                "hit",
                Some(elapsed_ms(started)),
                None,
            );
            let decision = cached.with_source_mode(SourceMode::Cache);
            return self.respond(decision, true, mode, fingerprint, started);
        }
        log_cache_operation(
            "GET",
            Some(&fingerprint),
            "miss",
            Some(elapsed_ms(started)),
            None,
        );

        let decision = self.compute(context, mode).await;
        self.respond(decision, false, mode, fingerprint, started)
    }

    async fn compute(&self, context: &RequestContext, mode: OperatingMode) -> Decision {
        let (backend, deadline, tag) = match (mode.allows_local_compute(), &self.remote) {
            (true, _) => (
                &self.primary,
                self.config.local_inference_timeout(),
                SourceMode::Normal,
            ),
            (false, Some(remote)) => (remote, self.config.cloud_timeout(), SourceMode::from(mode)),
            (false, None) => {
                self.metrics.record_fallback();
                debug!(mode = %mode, "No remote compute path, serving fallback");
                return Decision::fallback(
                    format!("local compute disabled in {mode} mode"),
                    fallback_tag(mode),
                );
            }
        };

        match compute_with_deadline(backend, context, deadline).await {
            Ok(decision) => {
                let decision = decision.with_source_mode(tag);
                if !self.cache.set(context, &decision).await {
                    debug!(symbol = %context.symbol(), "Decision served uncached");
                }
                decision
            }
            Err(e) => {
                match &e {
                    DecisionError::ComputeTimeout { .. } => self.metrics.record_compute_timeout(),
                    _ => self.metrics.record_compute_failure(),
                }
                self.metrics.record_fallback();
                warn!(
                    backend = %backend.name(),
                    mode = %mode,
                    error_kind = e.kind(),
                    error = %e,
                    "⚠️ Compute failed, serving fallback decision"
                );
                Decision::fallback(e.to_string(), fallback_tag(mode))
            }
        }
    }

    fn respond(
        &self,
        decision: Decision,
        cache_hit: bool,
        mode: OperatingMode,
        fingerprint: String,
        started: Instant,
    ) -> DecisionResponse {
        let total_latency_ms = elapsed_ms(started);
        self.metrics.record_decision(total_latency_ms);
        let decision = if decision.is_fallback() && decision.latency_ms <= 0.0 {
            decision.with_latency_ms(total_latency_ms)
        } else {
            decision
        };
        DecisionResponse {
            decision,
            cache_hit,
            mode,
            total_latency_ms,
            fingerprint,
        }
    }

    /// Seed the cache from `warmup_seeds`; returns how many writes succeeded
    pub async fn warmup(&self) -> usize {
        self.cache.warmup(&self.config.warmup_seeds).await
    }

    /// Spawn the health and alert loops. No-op if already running or shut down.
    pub fn start(&self) {
        if !self.is_accepting() {
            warn!("Start requested after shutdown, ignoring");
            return;
        }
        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() {
            debug!("Background tasks already running");
            return;
        }
        tasks.push(self.health.clone().spawn(self.shutdown_tx.subscribe()));
        tasks.push(self.alerts.clone().spawn(self.shutdown_tx.subscribe()));
        info!(tasks = tasks.len(), "🚀 Decision service background tasks started");
    }

    /// Stop accepting work, signal the loops, and wait for them to exit
    pub async fn shutdown(&self) {
        self.accepting.store(false, Ordering::Release);
        self.shutdown_tx.send_replace(true);

        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
        let count = handles.len();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Background task ended abnormally");
            }
        }
        info!(stopped_tasks = count, "🛑 Decision service shut down");
    }

    /// Run one health tick inline, outside the background loop
    pub async fn run_health_check(&self) -> HealthCheckOutcome {
        self.health.run_once().await
    }

    pub async fn check_alerts(&self) -> AlertReport {
        self.alerts.check_alerts().await
    }

    pub async fn enter_offline(&self, reason: impl Into<String>) -> Option<ModeTransition> {
        self.controller.enter_offline(reason).await
    }

    pub async fn restore_from_offline(&self) -> Option<ModeTransition> {
        self.controller.restore_from_offline().await
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub async fn status(&self) -> ServiceStatus {
        let cache = self.cache.health_report().await;
        let background_tasks = self.tasks.lock().len();
        ServiceStatus {
            mode: self.controller.mode(),
            accepting_requests: self.is_accepting(),
            background_tasks,
            counters: self.controller.counters(),
            metrics: self.metrics.snapshot(),
            cache,
            recent_transitions: self.controller.history(),
        }
    }
}

fn fallback_tag(mode: OperatingMode) -> SourceMode {
    match mode {
        OperatingMode::Offline => SourceMode::Offline,
        _ => SourceMode::Fallback,
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1_000.0
}
