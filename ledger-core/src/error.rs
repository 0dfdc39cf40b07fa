//! Error types for ledger operations

use crate::{Contest, Key};
use std::fmt;
use thiserror::Error;

/// Durable store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Entity not found: {key}")]
    NotFound { key: Key },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Invalid query: {reason}")]
    InvalidQuery { reason: String },
}

/// Local cache errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache backend error: {reason}")]
    Backend { reason: String },

    #[error("Cache serialization error: {reason}")]
    Serialization { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Per-key outcome of a batch lookup, aligned with the input keys.
///
/// `None` at index `i` means key `i` resolved.
#[derive(Debug, Clone, Default)]
pub struct MultiError {
    slots: Vec<Option<ContestError>>,
}

impl MultiError {
    pub fn new(slots: Vec<Option<ContestError>>) -> Self {
        Self { slots }
    }

    /// Number of slots, equal to the number of keys looked up.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Error for the key at `index`, if that key failed.
    pub fn get(&self, index: usize) -> Option<&ContestError> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Failed positions with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &ContestError)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|e| (i, e)))
    }

    pub fn failure_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn slots(&self) -> &[Option<ContestError>] {
        &self.slots
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut failures = self.failures();
        match failures.next() {
            None => write!(f, "no errors"),
            Some((index, first)) => {
                let others = self.failure_count() - 1;
                write!(f, "key {}: {}", index, first)?;
                if others > 0 {
                    write!(f, " (and {} other errors)", others)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for MultiError {}

/// A batch lookup where at least one key failed.
///
/// Keeps the contests that did resolve so callers can use them anyway.
#[derive(Debug, Clone)]
pub struct BatchError {
    partial: Vec<Option<Contest>>,
    errors: MultiError,
}

impl BatchError {
    pub fn new(partial: Vec<Option<Contest>>, errors: MultiError) -> Self {
        Self { partial, errors }
    }

    /// Resolved contests by position, `None` where the key failed.
    pub fn partial(&self) -> &[Option<Contest>] {
        &self.partial
    }

    pub fn errors(&self) -> &MultiError {
        &self.errors
    }

    pub fn into_parts(self) -> (Vec<Option<Contest>>, MultiError) {
        (self.partial, self.errors)
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} keys failed: {}",
            self.errors.failure_count(),
            self.errors.len(),
            self.errors
        )
    }
}

impl std::error::Error for BatchError {}

/// Master error type for ledger operations.
#[derive(Debug, Clone, Error)]
pub enum ContestError {
    #[error("missing key")]
    MissingKey,

    /// Cache miss. Only used inside the resolver to trigger store fallback.
    #[error("not found in cache: {key}")]
    NotFound { key: Key },

    /// Undecodable cache entry. Logged and treated as a miss.
    #[error("invalid cached value for {key}: {reason}")]
    InvalidCache { key: Key, reason: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    /// Only returned by explicit cache maintenance, never by lookups.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl ContestError {
    /// True when the durable store reported the entity as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ContestError::Store(StoreError::NotFound { .. }))
    }
}

/// Result type alias for ledger operations.
pub type ContestResult<T> = Result<T, ContestError>;
