//! # OpenTelemetry Instruments
//!
//! Mirrors the in-process counters onto the global meter so an installed
//! meter provider can export them. Without a provider every call is a no-op.
//!
//! Labels are kept low-cardinality: none on the counters, `mode` is encoded
//! as the gauge value (0 = NORMAL, 1 = DEGRADED, 2 = OFFLINE).

use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};
use std::sync::OnceLock;

static DECISION_METER: OnceLock<Meter> = OnceLock::new();

fn meter() -> &'static Meter {
    DECISION_METER.get_or_init(|| opentelemetry::global::meter_provider().meter("decision-core"))
}

fn counter(name: &'static str, description: &'static str) -> Counter<u64> {
    meter()
        .u64_counter(name)
        .with_description(description)
        .build()
}

/// Instruments are built once per metrics registry and reused on the hot path
#[derive(Debug, Clone)]
pub struct DecisionInstruments {
    pub cache_hits: Counter<u64>,
    pub cache_misses: Counter<u64>,
    pub cache_errors: Counter<u64>,
    pub cache_evictions: Counter<u64>,
    pub decisions: Counter<u64>,
    pub fallbacks: Counter<u64>,
    pub health_check_failures: Counter<u64>,
    pub alerts_published: Counter<u64>,
    pub operating_mode: Gauge<u64>,
    pub decision_latency: Histogram<f64>,
}

impl DecisionInstruments {
    pub fn new() -> Self {
        Self {
            cache_hits: counter("decision.cache.hits.total", "Cache lookups that found an entry"),
            cache_misses: counter(
                "decision.cache.misses.total",
                "Cache lookups that found nothing usable",
            ),
            cache_errors: counter(
                "decision.cache.errors.total",
                "Cache store or payload failures absorbed fail-open",
            ),
            cache_evictions: counter(
                "decision.cache.evictions.total",
                "Entries deleted by size enforcement",
            ),
            decisions: counter("decision.requests.total", "Decisions served"),
            fallbacks: counter(
                "decision.fallbacks.total",
                "Decisions answered with a fallback payload",
            ),
            health_check_failures: counter(
                "decision.health_check.failures.total",
                "Failed health probes",
            ),
            alerts_published: counter("decision.alerts.published.total", "Alerts handed to the sink"),
            operating_mode: meter()
                .u64_gauge("decision.mode")
                .with_description("Operating mode (0=NORMAL, 1=DEGRADED, 2=OFFLINE)")
                .build(),
            decision_latency: meter()
                .f64_histogram("decision.latency")
                .with_description("End-to-end decision latency in milliseconds")
                .with_unit("ms")
                .build(),
        }
    }
}

impl Default for DecisionInstruments {
    fn default() -> Self {
        Self::new()
    }
}
