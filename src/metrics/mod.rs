//! # Metrics
//!
//! Explicit counter registry owned by the decision service, plus the alert
//! monitor that turns those counters into throttled alert events.
//!
//! All counters are monotonic `AtomicU64`s updated with a single `fetch_add`,
//! so concurrent requests never lose increments. They only go back to zero
//! through [`DecisionMetrics::reset`].

pub mod monitor;
pub mod otel;

pub use monitor::AlertMonitor;
pub use otel::DecisionInstruments;

use crate::constants::OperatingMode;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Latency distribution over the most recent request window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub samples: usize,
    pub avg_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}

impl LatencyStats {
    fn from_window(window: &VecDeque<f64>) -> Self {
        if window.is_empty() {
            return Self::default();
        }
        let mut sorted: Vec<f64> = window.iter().copied().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let n = sorted.len();
        let percentile = |p: f64| {
            let rank = ((p * n as f64).ceil() as usize).clamp(1, n);
            sorted[rank - 1]
        };

        Self {
            samples: n,
            avg_ms: sorted.iter().sum::<f64>() / n as f64,
            p50_ms: percentile(0.50),
            p95_ms: percentile(0.95),
            p99_ms: percentile(0.99),
            max_ms: sorted[n - 1],
        }
    }
}

/// Point-in-time copy of every counter plus derived rates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_errors: u64,
    pub cache_evictions: u64,
    pub total_decisions: u64,
    pub health_check_failures: u64,
    pub fallback_decisions: u64,
    pub compute_timeouts: u64,
    pub compute_failures: u64,
    pub alerts_published: u64,
    pub mode_transitions: u64,
    pub hit_rate: f64,
    pub error_rate: f64,
    pub latency: LatencyStats,
    pub uptime_seconds: u64,
}

impl MetricsSnapshot {
    /// Total cache lookups (`hits + misses`)
    pub fn lookups(&self) -> u64 {
        self.cache_hits + self.cache_misses
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[derive(Debug)]
pub struct DecisionMetrics {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_errors: AtomicU64,
    cache_evictions: AtomicU64,
    total_decisions: AtomicU64,
    health_check_failures: AtomicU64,
    fallback_decisions: AtomicU64,
    compute_timeouts: AtomicU64,
    compute_failures: AtomicU64,
    alerts_published: AtomicU64,
    mode_transitions: AtomicU64,
    latencies: Mutex<VecDeque<f64>>,
    latency_window: usize,
    started_at: Instant,
    instruments: DecisionInstruments,
}

impl Default for DecisionMetrics {
    fn default() -> Self {
        Self::new(1_000)
    }
}

impl DecisionMetrics {
    pub fn new(latency_window: usize) -> Self {
        let latency_window = latency_window.max(1);
        Self {
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            cache_errors: AtomicU64::new(0),
            cache_evictions: AtomicU64::new(0),
            total_decisions: AtomicU64::new(0),
            health_check_failures: AtomicU64::new(0),
            fallback_decisions: AtomicU64::new(0),
            compute_timeouts: AtomicU64::new(0),
            compute_failures: AtomicU64::new(0),
            alerts_published: AtomicU64::new(0),
            mode_transitions: AtomicU64::new(0),
            latencies: Mutex::new(VecDeque::with_capacity(latency_window)),
            latency_window,
            started_at: Instant::now(),
            instruments: DecisionInstruments::new(),
        }
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        self.instruments.cache_hits.add(1, &[]);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        self.instruments.cache_misses.add(1, &[]);
    }

    pub fn record_cache_error(&self) {
        self.cache_errors.fetch_add(1, Ordering::Relaxed);
        self.instruments.cache_errors.add(1, &[]);
    }

    pub fn record_evictions(&self, count: u64) {
        if count == 0 {
            return;
        }
        self.cache_evictions.fetch_add(count, Ordering::Relaxed);
        self.instruments.cache_evictions.add(count, &[]);
    }

    pub fn record_health_check_failure(&self) {
        self.health_check_failures.fetch_add(1, Ordering::Relaxed);
        self.instruments.health_check_failures.add(1, &[]);
    }

    pub fn record_fallback(&self) {
        self.fallback_decisions.fetch_add(1, Ordering::Relaxed);
        self.instruments.fallbacks.add(1, &[]);
    }

    pub fn record_compute_timeout(&self) {
        self.compute_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_compute_failure(&self) {
        self.compute_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_alert_published(&self) {
        self.alerts_published.fetch_add(1, Ordering::Relaxed);
        self.instruments.alerts_published.add(1, &[]);
    }

    pub fn record_mode_transition(&self, to: OperatingMode) {
        self.mode_transitions.fetch_add(1, Ordering::Relaxed);
        self.instruments.operating_mode.record(to as u64, &[]);
    }

    /// Count a served decision and its end-to-end latency
    pub fn record_decision(&self, latency_ms: f64) {
        self.total_decisions.fetch_add(1, Ordering::Relaxed);
        self.instruments.decisions.add(1, &[]);
        self.instruments.decision_latency.record(latency_ms, &[]);

        let mut window = self.latencies.lock();
        if window.len() == self.latency_window {
            window.pop_front();
        }
        window.push_back(latency_ms);
    }

    pub fn alerts_published(&self) -> u64 {
        self.alerts_published.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let cache_misses = self.cache_misses.load(Ordering::Relaxed);
        let cache_errors = self.cache_errors.load(Ordering::Relaxed);
        let lookups = cache_hits + cache_misses;
        let latency = LatencyStats::from_window(&self.latencies.lock());

        MetricsSnapshot {
            cache_hits,
            cache_misses,
            cache_errors,
            cache_evictions: self.cache_evictions.load(Ordering::Relaxed),
            total_decisions: self.total_decisions.load(Ordering::Relaxed),
            health_check_failures: self.health_check_failures.load(Ordering::Relaxed),
            fallback_decisions: self.fallback_decisions.load(Ordering::Relaxed),
            compute_timeouts: self.compute_timeouts.load(Ordering::Relaxed),
            compute_failures: self.compute_failures.load(Ordering::Relaxed),
            alerts_published: self.alerts_published.load(Ordering::Relaxed),
            mode_transitions: self.mode_transitions.load(Ordering::Relaxed),
            hit_rate: ratio(cache_hits, lookups),
            error_rate: ratio(cache_errors, lookups),
            latency,
            uptime_seconds: self.started_at.elapsed().as_secs(),
        }
    }

    /// Zero every counter and the latency window
    pub fn reset(&self) {
        for counter in [
            &self.cache_hits,
            &self.cache_misses,
            &self.cache_errors,
            &self.cache_evictions,
            &self.total_decisions,
            &self.health_check_failures,
            &self.fallback_decisions,
            &self.compute_timeouts,
            &self.compute_failures,
            &self.alerts_published,
            &self.mode_transitions,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.latencies.lock().clear();
    }
}
