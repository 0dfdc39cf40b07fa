//! Ledger Core - Entity Types
//!
//! Pure data structures for the contest ledger: categories, hierarchical
//! keys, contests and the game results they are generated from, plus the
//! error, configuration and request-context types shared by every crate.

use chrono::{DateTime, Utc};

pub mod category;
pub mod config;
pub mod context;
pub mod entities;
pub mod error;
pub mod generate;
pub mod key;

pub use category::{Category, CategoryParseError};
pub use config::{LedgerConfig, MAX_CACHE_TTL};
pub use context::RequestContext;
pub use entities::{Contest, ContestMap, GameResult, Places, ResultsMap};
pub use error::{
    BatchError, CacheError, ConfigError, ContestError, ContestResult, MultiError, StoreError,
};
pub use generate::gen_contests;
pub use key::{contest_key, Key, CONTEST_KIND, OWNER_KIND};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;
