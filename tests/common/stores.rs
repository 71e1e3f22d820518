use async_trait::async_trait;
use decision_core::cache::{CacheStore, InMemoryCacheStore, KeyTtl, ScanPage};
use decision_core::{DecisionError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// In-memory store whose reads and writes can be failed independently
#[derive(Debug, Default)]
pub struct FlakyStore {
    pub inner: InMemoryCacheStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    corrupt_reads: AtomicBool,
}

impl FlakyStore {
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Return garbage bytes for every key that exists
    pub fn corrupt_reads(&self, corrupt: bool) {
        self.corrupt_reads.store(corrupt, Ordering::SeqCst);
    }

    fn check(&self, flag: &AtomicBool, operation: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(DecisionError::store_unavailable(format!(
                "{operation} refused by test store"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for FlakyStore {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.check(&self.fail_reads, "GET")?;
        let value = self.inner.get(key).await?;
        if self.corrupt_reads.load(Ordering::SeqCst) {
            return Ok(value.map(|_| b"{not json".to_vec()));
        }
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        self.check(&self.fail_writes, "SET")?;
        self.inner.set_with_ttl(key, value, ttl).await
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<ScanPage> {
        self.check(&self.fail_reads, "SCAN")?;
        self.inner.scan(cursor, pattern, count).await
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        self.check(&self.fail_writes, "DEL")?;
        self.inner.delete(keys).await
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        self.check(&self.fail_reads, "TTL")?;
        self.inner.ttl(key).await
    }

    async fn ping(&self) -> Result<()> {
        self.check(&self.fail_reads, "PING")?;
        self.inner.ping().await
    }
}
