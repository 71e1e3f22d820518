//! # Decision Cache
//!
//! TTL-bound cache in front of the compute step, addressed by request
//! fingerprint and backed by an external key-value store.
//!
//! ## Components
//!
//! - [`Fingerprinter`] - stable key derivation from a subset of request fields
//! - [`CacheStore`] - adapter boundary (GET / SET EX / SCAN / DEL / TTL)
//! - [`InMemoryCacheStore`] and `RedisCacheStore` - store adapters
//! - [`EvictionController`] - sampled, TTL-ordered size enforcement
//! - [`DecisionCache`] - get-before-compute, set-after-compute, warmup and
//!   clear, with the single fail-open policy for store and payload failures

pub mod decision_cache;
pub mod eviction;
pub mod fingerprint;
pub mod memory_store;
#[cfg(feature = "redis-store")]
pub mod redis_store;
pub mod store;

pub use decision_cache::{CacheHealthReport, DecisionCache};
pub use eviction::EvictionController;
pub use fingerprint::Fingerprinter;
pub use memory_store::InMemoryCacheStore;
#[cfg(feature = "redis-store")]
pub use redis_store::RedisCacheStore;
pub use store::{CacheStore, KeyTtl, ScanPage};

use crate::error::{DecisionError, Result};
use std::future::Future;
use std::time::Duration;

/// Bound a store call by `timeout`, reporting expiry as an unavailable store
pub(crate) async fn with_deadline<T, F>(operation: &'static str, timeout: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(DecisionError::store_unavailable(format!(
            "{operation} exceeded {}ms deadline",
            timeout.as_millis()
        ))),
    }
}

/// Walk a full SCAN iteration and collect every matching key
pub(crate) async fn scan_keys(
    store: &dyn CacheStore,
    pattern: &str,
    count: usize,
    timeout: Duration,
) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    let mut cursor = 0u64;
    loop {
        let page = with_deadline("SCAN", timeout, store.scan(cursor, pattern, count)).await?;
        keys.extend(page.keys);
        cursor = page.cursor;
        if cursor == 0 {
            break;
        }
    }
    keys.sort();
    keys.dedup();
    Ok(keys)
}
