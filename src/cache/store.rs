//! Cache store adapter boundary.
//!
//! The external key-value store is shared by every request and by the eviction
//! controller without client-side locking; the store itself arbitrates
//! consistency. Adapters report every failure as
//! [`DecisionError::StoreUnavailable`](crate::error::DecisionError::StoreUnavailable)
//! and leave the fail-open policy to [`DecisionCache`](super::DecisionCache).

use crate::error::Result;
use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

/// Remaining lifetime of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeyTtl {
    /// Key does not exist (or already expired)
    Missing,
    Expires(Duration),
    /// Key exists without an expiry
    Persistent,
}

impl KeyTtl {
    /// Redis `TTL` reply semantics: -2 missing, -1 no expiry
    pub fn from_redis_seconds(seconds: i64) -> Self {
        match seconds {
            -2 => KeyTtl::Missing,
            s if s < 0 => KeyTtl::Persistent,
            s => KeyTtl::Expires(Duration::from_secs(s as u64)),
        }
    }

    pub fn exists(&self) -> bool {
        !matches!(self, KeyTtl::Missing)
    }
}

/// One page of a cursor-based key scan. A `cursor` of 0 ends the iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    pub cursor: u64,
    pub keys: Vec<String>,
}

#[async_trait]
pub trait CacheStore: Send + Sync + Debug {
    /// Adapter name for logs
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    /// Scan keys matching a glob `pattern`, starting at `cursor` (0 to begin)
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<ScanPage>;

    /// Delete keys, returning how many existed
    async fn delete(&self, keys: &[String]) -> Result<u64>;

    async fn ttl(&self, key: &str) -> Result<KeyTtl>;

    async fn ping(&self) -> Result<()>;
}

/// Glob matching with `*` (any run) and `?` (any single char), as used by SCAN MATCH
pub fn glob_match(pattern: &str, candidate: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let candidate: Vec<char> = candidate.chars().collect();

    let (mut p, mut c) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut star_c = 0usize;

    while c < candidate.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == candidate[c]) {
            p += 1;
            c += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            star_c = c;
            p += 1;
        } else if let Some(s) = star {
            p = s + 1;
            star_c += 1;
            c = star_c;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_prefix() {
        assert!(glob_match("decision:*", "decision:abc"));
        assert!(glob_match("decision:*", "decision:"));
        assert!(!glob_match("decision:*", "other:abc"));
    }

    #[test]
    fn test_glob_wildcards() {
        assert!(glob_match("a?c", "abc"));
        assert!(!glob_match("a?c", "abbc"));
        assert!(glob_match("*:*:end", "x:y:end"));
        assert!(glob_match("*", ""));
        assert!(!glob_match("", "a"));
    }

    #[test]
    fn test_redis_ttl_semantics() {
        assert_eq!(KeyTtl::from_redis_seconds(-2), KeyTtl::Missing);
        assert_eq!(KeyTtl::from_redis_seconds(-1), KeyTtl::Persistent);
        assert_eq!(
            KeyTtl::from_redis_seconds(7),
            KeyTtl::Expires(Duration::from_secs(7))
        );
        assert!(!KeyTtl::Missing.exists());
    }

    #[test]
    fn test_ttl_ordering_puts_persistent_last() {
        let mut ttls = vec![
            KeyTtl::Persistent,
            KeyTtl::Expires(Duration::from_secs(9)),
            KeyTtl::Expires(Duration::from_secs(1)),
        ];
        ttls.sort();
        assert_eq!(ttls[0], KeyTtl::Expires(Duration::from_secs(1)));
        assert_eq!(ttls[2], KeyTtl::Persistent);
    }
}
