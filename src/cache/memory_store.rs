//! In-process [`CacheStore`] backed by `DashMap`.
//!
//! Expiry is evaluated lazily on access against the tokio clock, which lets
//! tests drive TTLs with `tokio::time::pause`/`advance`. Scans iterate over a
//! sorted snapshot, so a cursor is simply the offset of the next key.

use super::store::{glob_match, CacheStore, KeyTtl, ScanPage};
use crate::error::{DecisionError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug)]
pub struct InMemoryCacheStore {
    entries: DashMap<String, MemoryEntry>,
    available: AtomicBool,
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the store going away (or coming back)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    /// Live (unexpired) entry count, ignoring availability
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| !e.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self, operation: &str) -> Result<()> {
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(DecisionError::store_unavailable(format!(
                "in-memory store offline during {operation}"
            )))
        }
    }

    fn purge_if_expired(&self, key: &str, now: Instant) {
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.check_available("GET")?;
        let now = Instant::now();
        self.purge_if_expired(key, now);
        Ok(self.entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        self.check_available("SET")?;
        self.entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_vec(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<ScanPage> {
        self.check_available("SCAN")?;
        let now = Instant::now();

        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| !entry.is_expired(now) && glob_match(pattern, entry.key()))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();

        let start = (cursor as usize).min(keys.len());
        let end = start.saturating_add(count.max(1)).min(keys.len());
        let next = if end >= keys.len() { 0 } else { end as u64 };

        Ok(ScanPage {
            cursor: next,
            keys: keys[start..end].to_vec(),
        })
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        self.check_available("DEL")?;
        let now = Instant::now();
        let deleted = keys
            .iter()
            .filter_map(|key| self.entries.remove(key))
            .filter(|(_, entry)| !entry.is_expired(now))
            .count();
        Ok(deleted as u64)
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        self.check_available("TTL")?;
        let now = Instant::now();
        self.purge_if_expired(key, now);
        Ok(match self.entries.get(key) {
            None => KeyTtl::Missing,
            Some(entry) => match entry.expires_at {
                Some(at) => KeyTtl::Expires(at.saturating_duration_since(now)),
                None => KeyTtl::Persistent,
            },
        })
    }

    async fn ping(&self) -> Result<()> {
        self.check_available("PING")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_get_set_and_expiry() {
        let store = InMemoryCacheStore::new();
        store
            .set_with_ttl("k", b"v", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(store.ttl("k").await.unwrap(), KeyTtl::Missing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_reports_remaining() {
        let store = InMemoryCacheStore::new();
        store
            .set_with_ttl("k", b"v", Duration::from_secs(10))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(
            store.ttl("k").await.unwrap(),
            KeyTtl::Expires(Duration::from_secs(7))
        );
    }

    #[tokio::test]
    async fn test_scan_pages_through_matching_keys() {
        let store = InMemoryCacheStore::new();
        for i in 0..7 {
            store
                .set_with_ttl(&format!("p:{i}"), b"x", Duration::from_secs(60))
                .await
                .unwrap();
        }
        store
            .set_with_ttl("other:1", b"x", Duration::from_secs(60))
            .await
            .unwrap();

        let mut cursor = 0;
        let mut seen = Vec::new();
        loop {
            let page = store.scan(cursor, "p:*", 3).await.unwrap();
            seen.extend(page.keys);
            cursor = page.cursor;
            if cursor == 0 {
                break;
            }
        }
        assert_eq!(seen.len(), 7);
        assert!(seen.iter().all(|k| k.starts_with("p:")));
    }

    #[tokio::test]
    async fn test_delete_counts_existing_keys() {
        let store = InMemoryCacheStore::new();
        store
            .set_with_ttl("a", b"1", Duration::from_secs(60))
            .await
            .unwrap();
        let deleted = store
            .delete(&["a".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_store_errors() {
        let store = InMemoryCacheStore::new();
        store.set_available(false);
        let err = store.get("k").await.unwrap_err();
        assert!(err.is_fail_open());
        assert!(store.ping().await.is_err());

        store.set_available(true);
        assert!(store.ping().await.is_ok());
    }
}
