//! LMDB-backed cache implementation.
//!
//! Uses the heed crate (Rust bindings for LMDB) to keep cached contests in
//! a memory-mapped file, so the cache survives process restarts while
//! still being local to the host.
//!
//! # Value Format
//!
//! Each value is `[expires_at: 8 bytes, i64 millis LE][payload]`. Entries
//! past their expiry are reported as misses and removed lazily.

use std::path::Path;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use ledger_core::{CacheError, LedgerConfig};

use super::traits::{CacheStats, LocalCache};

const EXPIRY_LEN: usize = 8;

/// Error type for LMDB cache setup.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// No path configured.
    #[error("LMDB cache path is not configured")]
    MissingPath,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for CacheError {
    fn from(e: LmdbCacheError) -> Self {
        CacheError::Backend {
            reason: e.to_string(),
        }
    }
}

fn txn_error(e: heed::Error) -> CacheError {
    LmdbCacheError::Transaction(e.to_string()).into()
}

/// LMDB-backed cache with a single default expiry.
pub struct LmdbCache {
    env: Env,
    db: Database<Bytes, Bytes>,
    default_ttl: Duration,
    stats: RwLock<CacheStats>,
}

impl LmdbCache {
    /// Open (or create) a cache under `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `max_size_mb` overflows when converted to bytes
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn new<P: AsRef<Path>>(
        path: P,
        max_size_mb: usize,
        default_ttl: Duration,
    ) -> Result<Self, LmdbCacheError> {
        let map_size = max_size_mb.checked_mul(1024 * 1024).ok_or_else(|| {
            LmdbCacheError::EnvOpen(format!("map size of {} MB overflows", max_size_mb))
        })?;

        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(Self {
            env,
            db,
            default_ttl,
            stats: RwLock::new(CacheStats::default()),
        })
    }

    /// Open the cache described by `config.lmdb_path`.
    pub fn from_config(config: &LedgerConfig) -> Result<Self, LmdbCacheError> {
        let path = config.lmdb_path.as_ref().ok_or(LmdbCacheError::MissingPath)?;
        Self::new(path, config.lmdb_max_size_mb, config.cache_default_ttl)
    }

    fn record(&self, hit: bool) {
        if let Ok(mut stats) = self.stats.write() {
            if hit {
                stats.hits += 1;
            } else {
                stats.misses += 1;
            }
        }
    }

    fn expires_at(&self, now: DateTime<Utc>) -> i64 {
        chrono::Duration::from_std(self.default_ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .map(|t| t.timestamp_millis())
            .unwrap_or(i64::MAX)
    }

    /// Split a stored value into its expiry and payload.
    fn decode_value(bytes: &[u8]) -> Option<(i64, &[u8])> {
        if bytes.len() < EXPIRY_LEN {
            return None;
        }
        let (expiry, payload) = bytes.split_at(EXPIRY_LEN);
        let expiry: [u8; EXPIRY_LEN] = expiry.try_into().ok()?;
        Some((i64::from_le_bytes(expiry), payload))
    }

    fn remove(&self, key: &str) -> Result<bool, CacheError> {
        let mut wtxn = self.env.write_txn().map_err(txn_error)?;
        let deleted = self.db.delete(&mut wtxn, key.as_bytes()).map_err(txn_error)?;
        wtxn.commit().map_err(txn_error)?;
        Ok(deleted)
    }
}

#[async_trait]
impl LocalCache for LmdbCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Utc::now().timestamp_millis();

        let live = {
            let rtxn = self.env.read_txn().map_err(txn_error)?;
            match self.db.get(&rtxn, key.as_bytes()).map_err(txn_error)? {
                Some(bytes) => match Self::decode_value(bytes) {
                    Some((expires_at, payload)) if now < expires_at => Some(Some(payload.to_vec())),
                    _ => Some(None),
                },
                None => None,
            }
        };

        match live {
            Some(Some(payload)) => {
                self.record(true);
                Ok(Some(payload))
            }
            Some(None) => {
                self.record(false);
                self.remove(key)?;
                Ok(None)
            }
            None => {
                self.record(false);
                Ok(None)
            }
        }
    }

    async fn set_default(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        let mut full_bytes = Vec::with_capacity(EXPIRY_LEN + value.len());
        full_bytes.extend_from_slice(&self.expires_at(Utc::now()).to_le_bytes());
        full_bytes.extend_from_slice(&value);

        let mut wtxn = self.env.write_txn().map_err(txn_error)?;
        self.db
            .put(&mut wtxn, key.as_bytes(), &full_bytes)
            .map_err(txn_error)?;
        wtxn.commit().map_err(txn_error)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        self.remove(key)
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        let rtxn = self.env.read_txn().map_err(txn_error)?;
        let entry_count = self.db.len(&rtxn).map_err(txn_error)?;
        let stats = self
            .stats
            .read()
            .map(|s| s.clone())
            .unwrap_or_default();
        Ok(CacheStats {
            entry_count,
            ..stats
        })
    }
}
