//! # Eviction Controller
//!
//! Keeps the number of entries under the key prefix at or below `max_size`.
//!
//! Victims are chosen by sampling remaining-TTL metadata and deleting the
//! entries with the *largest* remaining TTL first (keys without expiry go
//! before all of them). This approximates "most recently written" and is not
//! LRU: nothing here tracks access recency.
//!
//! Failures never propagate. A scan or delete failure ends the pass with
//! whatever was deleted so far; the next write that triggers enforcement
//! simply tries again.

use super::store::{CacheStore, KeyTtl};
use super::{scan_keys, with_deadline};
use crate::config::DecisionServiceConfig;
use crate::metrics::DecisionMetrics;
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct EvictionController {
    store: Arc<dyn CacheStore>,
    metrics: Arc<DecisionMetrics>,
    pattern: String,
    max_size: usize,
    sample_size: usize,
    batch_size: usize,
    scan_count: usize,
    operation_timeout: Duration,
    /// Set while a pass runs; concurrent triggers skip instead of piling up scans
    in_progress: AtomicBool,
}

/// Clears the in-progress flag when a pass ends, on every exit path
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl EvictionController {
    pub fn new(
        store: Arc<dyn CacheStore>,
        metrics: Arc<DecisionMetrics>,
        config: &DecisionServiceConfig,
    ) -> Self {
        Self {
            store,
            metrics,
            pattern: config.key_pattern(),
            max_size: config.max_size,
            sample_size: config.eviction_sample_size,
            batch_size: config.eviction_batch_size,
            scan_count: config.scan_count,
            operation_timeout: config.cache_operation_timeout(),
            in_progress: AtomicBool::new(false),
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Run one enforcement pass, returning how many entries were deleted
    pub async fn enforce_size_limit(&self) -> u64 {
        self.enforce_size_limit_for(None).await
    }

    /// Enforcement ahead of a write to `incoming`. When that key is not yet
    /// stored, one extra slot is freed so the write lands at `max_size`.
    pub async fn enforce_size_limit_for(&self, incoming: Option<&str>) -> u64 {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Eviction pass already running, skipping");
            return 0;
        }
        let _guard = PassGuard(&self.in_progress);

        let keys = match scan_keys(
            self.store.as_ref(),
            &self.pattern,
            self.scan_count,
            self.operation_timeout,
        )
        .await
        {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Eviction scan failed, deferring to next write");
                return 0;
            }
        };

        let incoming_is_new = incoming.is_some_and(|key| !keys.iter().any(|k| k == key));
        let limit = if incoming_is_new {
            self.max_size.saturating_sub(1)
        } else {
            self.max_size
        };
        if keys.len() <= limit {
            return 0;
        }
        let excess = keys.len() - limit;

        let victims = self.select_victims(keys, excess).await;
        let deleted = self.delete_victims(&victims).await;

        self.metrics.record_evictions(deleted);

        info!(
            excess = excess,
            evicted = deleted,
            max_size = self.max_size,
            "🧹 Cache size enforcement pass complete"
        );

        deleted
    }

    /// Sample TTLs and pick up to `excess` keys, largest remaining TTL first
    async fn select_victims(&self, keys: Vec<String>, excess: usize) -> Vec<String> {
        let sample_len = self.sample_size.max(excess).min(keys.len());
        let sample = &keys[..sample_len];

        let ttls = join_all(sample.iter().map(|key| {
            with_deadline("TTL", self.operation_timeout, self.store.ttl(key))
        }))
        .await;

        let mut candidates: Vec<(KeyTtl, &String)> = sample
            .iter()
            .zip(ttls)
            .filter_map(|(key, ttl)| match ttl {
                Ok(ttl) if ttl.exists() => Some((ttl, key)),
                Ok(_) => None,
                Err(e) => {
                    debug!(key = %key, error = %e, "TTL lookup failed, skipping candidate");
                    None
                }
            })
            .collect();

        candidates.sort_by(|a, b| b.0.cmp(&a.0));
        candidates
            .into_iter()
            .take(excess)
            .map(|(_, key)| key.clone())
            .collect()
    }

    async fn delete_victims(&self, victims: &[String]) -> u64 {
        let mut deleted = 0u64;
        for batch in victims.chunks(self.batch_size.max(1)) {
            match with_deadline("DEL", self.operation_timeout, self.store.delete(batch)).await {
                Ok(count) => deleted += count,
                Err(e) => {
                    warn!(
                        error = %e,
                        deleted_so_far = deleted,
                        "Eviction delete failed, aborting pass"
                    );
                    break;
                }
            }
        }
        deleted
    }
}
