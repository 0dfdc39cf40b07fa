//! Local cache layer.
//!
//! The resolver only sees the [`LocalCache`] trait: string keys in, opaque
//! bytes out, one default expiry. Two backends are provided:
//!
//! - [`MemoryCache`]: bounded in-process map, the usual choice
//! - [`LmdbCache`]: memory-mapped LMDB file that survives restarts

pub mod lmdb_backend;
pub mod memory;
pub mod traits;

pub use lmdb_backend::{LmdbCache, LmdbCacheError};
pub use memory::MemoryCache;
pub use traits::{CacheStats, LocalCache};
