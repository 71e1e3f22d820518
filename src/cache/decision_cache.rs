//! Get-before-compute / set-after-compute cache orchestration.
//!
//! This is the one place the fail-open policy lives: every store error or
//! corrupt payload is counted in `cache_errors`, logged, and turned into a
//! miss (on read) or a `false` return (on write). Nothing in here returns an
//! error to the request path.

use super::eviction::EvictionController;
use super::fingerprint::Fingerprinter;
use super::store::CacheStore;
use super::{scan_keys, with_deadline};
use crate::config::DecisionServiceConfig;
use crate::error::{DecisionError, Result};
use crate::metrics::DecisionMetrics;
use crate::models::{Decision, RequestContext};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Upper bound on scan+delete rounds in [`DecisionCache::clear`]
const MAX_CLEAR_ROUNDS: usize = 16;

/// Composite cache health used by the `unhealthy` alert rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheHealthReport {
    pub store: String,
    pub store_reachable: bool,
    pub size: Option<usize>,
    pub max_size: usize,
    pub utilization: Option<f64>,
    pub hit_rate: f64,
    pub error_rate: f64,
    pub lookups: u64,
    pub healthy: bool,
    pub issues: Vec<String>,
}

#[derive(Debug)]
pub struct DecisionCache {
    store: Arc<dyn CacheStore>,
    metrics: Arc<DecisionMetrics>,
    eviction: EvictionController,
    fingerprinter: Fingerprinter,
    key_prefix: String,
    key_pattern: String,
    ttl: Duration,
    operation_timeout: Duration,
    scan_count: usize,
    batch_size: usize,
    hit_rate_target: f64,
    error_rate_threshold: f64,
    size_utilization_limit: f64,
}

impl DecisionCache {
    /// Build a cache over `store`. Invalid configuration (e.g. a zero TTL) is
    /// rejected here rather than on first use.
    pub fn new(
        store: Arc<dyn CacheStore>,
        metrics: Arc<DecisionMetrics>,
        config: &DecisionServiceConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            eviction: EvictionController::new(store.clone(), metrics.clone(), config),
            store,
            metrics,
            fingerprinter: Fingerprinter::new(config.fingerprint_fields.iter().cloned()),
            key_prefix: config.key_prefix.clone(),
            key_pattern: config.key_pattern(),
            ttl: config.ttl(),
            operation_timeout: config.cache_operation_timeout(),
            scan_count: config.scan_count,
            batch_size: config.eviction_batch_size,
            hit_rate_target: config.hit_rate_target,
            error_rate_threshold: config.alert_error_rate_threshold,
            size_utilization_limit: config.size_utilization_limit,
        })
    }

    pub fn fingerprint(&self, context: &RequestContext) -> String {
        self.fingerprinter.fingerprint(context)
    }

    /// Namespaced store key for a context
    pub fn key_for(&self, context: &RequestContext) -> String {
        format!("{}{}", self.key_prefix, self.fingerprint(context))
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    pub fn eviction(&self) -> &EvictionController {
        &self.eviction
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a cached decision. Exactly one of `cache_hits` / `cache_misses`
    /// is incremented per call; failures additionally bump `cache_errors`.
    pub async fn get(&self, context: &RequestContext) -> Option<Decision> {
        let key = self.key_for(context);

        let bytes = match with_deadline("GET", self.operation_timeout, self.store.get(&key)).await
        {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                self.metrics.record_cache_miss();
                return None;
            }
            Err(e) => {
                self.absorb("GET", &key, &e);
                self.metrics.record_cache_miss();
                return None;
            }
        };

        match serde_json::from_slice::<Decision>(&bytes) {
            Ok(decision) => {
                self.metrics.record_cache_hit();
                debug!(key = %key, "Cache hit");
                Some(decision)
            }
            Err(e) => {
                self.absorb("GET", &key, &DecisionError::from(e));
                self.metrics.record_cache_miss();
                None
            }
        }
    }

    /// Write a decision with the configured TTL. Runs size enforcement first;
    /// an eviction problem never blocks the write. Returns `false` on failure.
    pub async fn set(&self, context: &RequestContext, decision: &Decision) -> bool {
        let key = self.key_for(context);
        self.eviction.enforce_size_limit_for(Some(&key)).await;

        let payload = match serde_json::to_vec(decision) {
            Ok(payload) => payload,
            Err(e) => {
                self.absorb("SET", &key, &DecisionError::from(e));
                return false;
            }
        };

        match with_deadline(
            "SET",
            self.operation_timeout,
            self.store.set_with_ttl(&key, &payload, self.ttl),
        )
        .await
        {
            Ok(()) => {
                debug!(key = %key, ttl_seconds = self.ttl.as_secs(), "Cache SET");
                true
            }
            Err(e) => {
                self.absorb("SET", &key, &e);
                false
            }
        }
    }

    /// Count a store-side failure and log it; the caller carries on as if the
    /// entry were absent. Anything outside the fail-open class is logged louder
    /// but still absorbed.
    fn absorb(&self, operation: &'static str, key: &str, e: &DecisionError) {
        self.metrics.record_cache_error();
        if e.is_fail_open() {
            warn!(
                operation = operation,
                key = %key,
                error_kind = e.kind(),
                error = %e,
                "Cache operation failed, proceeding without cache"
            );
        } else {
            error!(
                operation = operation,
                key = %key,
                error_kind = e.kind(),
                error = %e,
                "Unexpected cache error, proceeding without cache"
            );
        }
    }

    /// Write placeholder decisions for each seed, returning the number written.
    /// Re-running overwrites the same keys.
    pub async fn warmup(&self, seeds: &[RequestContext]) -> usize {
        if seeds.is_empty() {
            return 0;
        }

        let mut written = 0;
        for seed in seeds {
            if self.set(seed, &Decision::warmup_placeholder(seed)).await {
                written += 1;
            }
        }

        info!(
            seeds = seeds.len(),
            written = written,
            "🔥 Cache warmup complete"
        );
        written
    }

    /// Delete every key under the prefix. Returns `false` if the store is
    /// unreachable on the first scan or a later round fails.
    pub async fn clear(&self) -> bool {
        for round in 0..MAX_CLEAR_ROUNDS {
            let keys = match scan_keys(
                self.store.as_ref(),
                &self.key_pattern,
                self.scan_count,
                self.operation_timeout,
            )
            .await
            {
                Ok(keys) => keys,
                Err(e) => {
                    warn!(round = round, error = %e, "Cache clear scan failed");
                    return false;
                }
            };

            if keys.is_empty() {
                info!(rounds = round, "Cache cleared");
                return true;
            }

            for batch in keys.chunks(self.batch_size.max(1)) {
                if let Err(e) =
                    with_deadline("DEL", self.operation_timeout, self.store.delete(batch)).await
                {
                    warn!(round = round, error = %e, "Cache clear delete failed");
                    return false;
                }
            }
        }

        warn!(
            rounds = MAX_CLEAR_ROUNDS,
            "Cache clear stopped with keys still being written"
        );
        true
    }

    /// Current entry count under the prefix
    pub async fn size(&self) -> Result<usize> {
        let keys = scan_keys(
            self.store.as_ref(),
            &self.key_pattern,
            self.scan_count,
            self.operation_timeout,
        )
        .await?;
        Ok(keys.len())
    }

    /// Composite health: store reachable, utilization within limit, error rate
    /// within threshold, and hit rate at target once there have been lookups.
    pub async fn health_report(&self) -> CacheHealthReport {
        let snapshot = self.metrics.snapshot();
        let mut issues = Vec::new();

        let store_reachable =
            match with_deadline("PING", self.operation_timeout, self.store.ping()).await {
                Ok(()) => true,
                Err(e) => {
                    issues.push(format!("store unreachable: {e}"));
                    false
                }
            };

        let size = if store_reachable {
            match self.size().await {
                Ok(size) => Some(size),
                Err(e) => {
                    issues.push(format!("size unavailable: {e}"));
                    None
                }
            }
        } else {
            None
        };

        let max_size = self.eviction.max_size();
        let utilization = size.map(|s| s as f64 / max_size as f64);
        if let Some(u) = utilization {
            if u > self.size_utilization_limit {
                issues.push(format!(
                    "utilization {u:.2} above {:.2}",
                    self.size_utilization_limit
                ));
            }
        }

        if snapshot.error_rate > self.error_rate_threshold {
            issues.push(format!(
                "error rate {:.3} above {:.3}",
                snapshot.error_rate, self.error_rate_threshold
            ));
        }

        if snapshot.lookups() > 0 && snapshot.hit_rate < self.hit_rate_target {
            issues.push(format!(
                "hit rate {:.3} below target {:.3}",
                snapshot.hit_rate, self.hit_rate_target
            ));
        }

        CacheHealthReport {
            store: self.store.name().to_string(),
            store_reachable,
            size,
            max_size,
            utilization,
            hit_rate: snapshot.hit_rate,
            error_rate: snapshot.error_rate,
            lookups: snapshot.lookups(),
            healthy: issues.is_empty(),
            issues,
        }
    }
}
