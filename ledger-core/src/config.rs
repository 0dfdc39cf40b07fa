//! Configuration types

use crate::{ConfigError, ContestError, ContestResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Longest accepted cache expiry: one year.
pub const MAX_CACHE_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

const BYTES_PER_MB: usize = 1024 * 1024;

/// Ledger configuration.
///
/// Only the local cache is configurable; the durable store is handed to
/// the client already connected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Expiry applied to every cache insert.
    pub cache_default_ttl: Duration,
    /// Upper bound on in-memory cache entries.
    pub cache_max_entries: usize,
    /// Directory for the LMDB-backed cache, if used.
    pub lmdb_path: Option<PathBuf>,
    pub lmdb_max_size_mb: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            cache_default_ttl: Duration::from_secs(3600),
            cache_max_entries: 10_000,
            lmdb_path: None,
            lmdb_max_size_mb: 64,
        }
    }
}

impl LedgerConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `LEDGER_CACHE_TTL_SECS`: Cache entry expiry in seconds (default: 3600)
    /// - `LEDGER_CACHE_MAX_ENTRIES`: In-memory cache capacity (default: 10000)
    /// - `LEDGER_LMDB_PATH`: LMDB cache directory (default: unset)
    /// - `LEDGER_LMDB_MAX_SIZE_MB`: LMDB map size in megabytes (default: 64)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            cache_default_ttl: std::env::var("LEDGER_CACHE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_default_ttl),
            cache_max_entries: std::env::var("LEDGER_CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.cache_max_entries),
            lmdb_path: std::env::var("LEDGER_LMDB_PATH")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .or(defaults.lmdb_path),
            lmdb_max_size_mb: std::env::var("LEDGER_LMDB_MAX_SIZE_MB")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.lmdb_max_size_mb),
        }
    }

    /// Set the cache expiry.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.cache_default_ttl = ttl;
        self
    }

    /// Set the in-memory cache capacity.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.cache_max_entries = max;
        self
    }

    /// Use an LMDB cache at `path`.
    pub fn with_lmdb_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lmdb_path = Some(path.into());
        self
    }

    /// LMDB map size in bytes, if it fits in `usize`.
    pub fn lmdb_map_size_bytes(&self) -> Option<usize> {
        self.lmdb_max_size_mb.checked_mul(BYTES_PER_MB)
    }

    /// Validate the configuration.
    /// Returns Ok(()) if valid, Err(ContestError::Config) if invalid.
    pub fn validate(&self) -> ContestResult<()> {
        if self.cache_default_ttl.is_zero() {
            return Err(ContestError::Config(ConfigError::InvalidValue {
                field: "cache_default_ttl".to_string(),
                value: format!("{:?}", self.cache_default_ttl),
                reason: "cache_default_ttl must be positive".to_string(),
            }));
        }

        if self.cache_default_ttl > MAX_CACHE_TTL {
            return Err(ContestError::Config(ConfigError::InvalidValue {
                field: "cache_default_ttl".to_string(),
                value: format!("{:?}", self.cache_default_ttl),
                reason: format!("cache_default_ttl must be at most {:?}", MAX_CACHE_TTL),
            }));
        }

        if self.cache_max_entries == 0 {
            return Err(ContestError::Config(ConfigError::InvalidValue {
                field: "cache_max_entries".to_string(),
                value: self.cache_max_entries.to_string(),
                reason: "cache_max_entries must be greater than 0".to_string(),
            }));
        }

        if self.lmdb_max_size_mb == 0 {
            return Err(ContestError::Config(ConfigError::InvalidValue {
                field: "lmdb_max_size_mb".to_string(),
                value: self.lmdb_max_size_mb.to_string(),
                reason: "lmdb_max_size_mb must be greater than 0".to_string(),
            }));
        }

        if self.lmdb_map_size_bytes().is_none() {
            return Err(ContestError::Config(ConfigError::InvalidValue {
                field: "lmdb_max_size_mb".to_string(),
                value: self.lmdb_max_size_mb.to_string(),
                reason: "lmdb_max_size_mb overflows when converted to bytes".to_string(),
            }));
        }

        Ok(())
    }
}
