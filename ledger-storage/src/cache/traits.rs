//! Local cache trait and statistics.

use async_trait::async_trait;
use ledger_core::CacheError;

/// Process-local expiring key/value cache.
///
/// Keys are encoded entity keys; values are opaque bytes, so a backend
/// never needs to know what it stores and a reader must be ready for an
/// entry it cannot decode. Implementations are internally synchronized.
#[async_trait]
pub trait LocalCache: Send + Sync {
    /// Get a live entry. Expired entries are reported as absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Insert or replace an entry using the backend's default expiry.
    async fn set_default(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError>;

    /// Remove an entry. Returns whether one was present.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Get cache statistics.
    async fn stats(&self) -> Result<CacheStats, CacheError>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses, expired entries included.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Approximate payload size in bytes.
    pub memory_bytes: u64,
    /// Number of live entries dropped to make room.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }
}
