//! In-memory expiring cache.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use ledger_core::{CacheError, LedgerConfig};

use super::traits::{CacheStats, LocalCache};

/// Expiry used when `now + ttl` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Debug)]
struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
    seq: u64,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Entries plus an index ordered by expiry.
///
/// Every entry has exactly one index slot, keyed by `(expires_at, seq)`.
#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    by_expiry: BTreeMap<(Instant, u64), String>,
    next_seq: u64,
    bytes: u64,
}

impl Inner {
    fn insert(&mut self, key: &str, value: Vec<u8>, expires_at: Instant) {
        self.remove(key);

        let seq = self.next_seq;
        self.next_seq += 1;
        self.bytes += value.len() as u64;
        self.by_expiry.insert((expires_at, seq), key.to_string());
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at,
                seq,
            },
        );
    }

    fn remove(&mut self, key: &str) -> Option<Entry> {
        let entry = self.entries.remove(key)?;
        self.by_expiry.remove(&(entry.expires_at, entry.seq));
        self.bytes -= entry.value.len() as u64;
        Some(entry)
    }

    /// Remove the entry closest to expiry.
    fn pop_soonest(&mut self) -> Option<Entry> {
        let (_, key) = self.by_expiry.pop_first()?;
        let entry = self.entries.remove(&key)?;
        self.bytes -= entry.value.len() as u64;
        Some(entry)
    }

    /// Drop expired entries. Returns how many were dropped.
    fn purge_expired(&mut self, now: Instant) -> usize {
        let mut purged = 0;
        while let Some((&(expires_at, _), _)) = self.by_expiry.first_key_value() {
            if expires_at > now {
                break;
            }
            self.pop_soonest();
            purged += 1;
        }
        purged
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.by_expiry.clear();
        self.bytes = 0;
    }
}

/// Bounded in-process cache with a single default expiry.
///
/// Reads never extend an entry's lifetime. When full, expired entries are
/// dropped first, then the entry closest to expiry. Lookups of live entries
/// only take the read lock.
#[derive(Debug)]
pub struct MemoryCache {
    default_ttl: Duration,
    max_entries: usize,
    inner: RwLock<Inner>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl MemoryCache {
    pub fn new(default_ttl: Duration, max_entries: usize) -> Self {
        Self {
            default_ttl,
            max_entries: max_entries.max(1),
            inner: RwLock::new(Inner::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(config.cache_default_ttl, config.cache_max_entries)
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Drop every entry, keeping statistics.
    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.clear();
        }
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn expires_at(&self, now: Instant) -> Instant {
        now.checked_add(self.default_ttl)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now)
    }

    fn make_room(&self, inner: &mut Inner, now: Instant) {
        if inner.entries.len() < self.max_entries {
            return;
        }

        inner.purge_expired(now);
        while inner.entries.len() >= self.max_entries {
            if inner.pop_soonest().is_none() {
                break;
            }
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }
}

fn poisoned() -> CacheError {
    CacheError::Backend {
        reason: "cache lock poisoned".to_string(),
    }
}

#[async_trait]
impl LocalCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Instant::now();

        let expired = {
            let inner = self.inner.read().map_err(|_| poisoned())?;
            match inner.entries.get(key) {
                Some(entry) if !entry.is_expired(now) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(Some(entry.value.clone()));
                }
                Some(_) => true,
                None => false,
            }
        };

        if expired {
            let mut inner = self.inner.write().map_err(|_| poisoned())?;
            // May have been replaced since the read lock was released.
            if matches!(inner.entries.get(key), Some(entry) if entry.is_expired(now)) {
                inner.remove(key);
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    async fn set_default(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        let now = Instant::now();

        if !inner.entries.contains_key(key) {
            self.make_room(&mut inner, now);
        }
        let expires_at = self.expires_at(now);
        inner.insert(key, value, expires_at);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        Ok(inner.remove(key).is_some())
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: inner.entries.len() as u64,
            memory_bytes: inner.bytes,
            evictions: self.evictions.load(Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_after_set() {
        let cache = MemoryCache::new(Duration::from_secs(60), 10);
        cache.set_default("a", b"one".to_vec()).await.unwrap();

        assert_eq!(cache.get("a").await.unwrap(), Some(b"one".to_vec()));
        assert_eq!(cache.get("b").await.unwrap(), None);

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.memory_bytes, 3);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = MemoryCache::new(Duration::from_millis(20), 10);
        cache.set_default("a", b"one".to_vec()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(cache.get("a").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_capacity_evicts_soonest_expiry() {
        let cache = MemoryCache::new(Duration::from_secs(60), 2);
        cache.set_default("a", b"1".to_vec()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.set_default("b", b"2".to_vec()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.set_default("c", b"3".to_vec()).await.unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a").await.unwrap(), None);
        assert!(cache.get("b").await.unwrap().is_some());
        assert!(cache.get("c").await.unwrap().is_some());
        assert_eq!(cache.stats().await.unwrap().evictions, 1);
    }

    #[tokio::test]
    async fn test_replacing_does_not_evict() {
        let cache = MemoryCache::new(Duration::from_secs(60), 1);
        cache.set_default("a", b"1".to_vec()).await.unwrap();
        cache.set_default("a", b"2".to_vec()).await.unwrap();

        assert_eq!(cache.get("a").await.unwrap(), Some(b"2".to_vec()));
        assert_eq!(cache.stats().await.unwrap().evictions, 0);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let cache = MemoryCache::from_config(&LedgerConfig::default());
        cache.set_default("a", b"1".to_vec()).await.unwrap();
        cache.set_default("b", b"2".to_vec()).await.unwrap();

        assert!(cache.delete("a").await.unwrap());
        assert!(!cache.delete("a").await.unwrap());

        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_huge_ttl_does_not_overflow() {
        let cache = MemoryCache::new(Duration::from_secs(u64::MAX), 4);
        cache.set_default("a", b"1".to_vec()).await.unwrap();

        assert_eq!(cache.get("a").await.unwrap(), Some(b"1".to_vec()));
    }

    #[tokio::test]
    async fn test_full_cache_prefers_expired_over_live() {
        let cache = MemoryCache::new(Duration::from_millis(20), 2);
        cache.set_default("a", b"1".to_vec()).await.unwrap();
        cache.set_default("b", b"2".to_vec()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;
        cache.set_default("c", b"3".to_vec()).await.unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().await.unwrap().evictions, 0);
    }

    #[tokio::test]
    async fn test_index_stays_consistent_under_churn() {
        let cache = MemoryCache::new(Duration::from_secs(60), 50);
        for round in 0..5u8 {
            for i in 0..200 {
                let key = format!("k{}", i);
                cache.set_default(&key, vec![round; 4]).await.unwrap();
            }
            for i in (0..200).step_by(3) {
                cache.delete(&format!("k{}", i)).await.unwrap();
            }
        }

        let stats = cache.stats().await.unwrap();
        let inner = cache.inner.read().unwrap();
        assert_eq!(inner.entries.len(), inner.by_expiry.len());
        assert!(inner.entries.len() <= 50);
        assert_eq!(stats.memory_bytes, 4 * inner.entries.len() as u64);
    }
}
