//! Ledger Storage - Store Trait, Cache Backends and Resolver
//!
//! Defines the durable store abstraction for contests, the local cache
//! backends, and [`ContestClient`], which resolves contests cache-first and
//! aggregates unapplied contests per owner.

pub mod batch;
pub mod cache;
pub mod client;
pub mod query;

pub use batch::Batch;
pub use cache::{CacheStats, LmdbCache, LmdbCacheError, LocalCache, MemoryCache};
pub use client::ContestClient;
pub use query::ContestQuery;

use async_trait::async_trait;
use chrono::Utc;
use ledger_core::{Contest, Key, RequestContext, StoreError};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::RwLock;

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Durable keyed store for contests.
///
/// Implementations should honor `ctx` cancellation and report it as
/// [`StoreError::Cancelled`].
#[async_trait]
pub trait ContestStore: Send + Sync {
    /// Get a contest by key. Absent keys are [`StoreError::NotFound`].
    async fn get(&self, ctx: &RequestContext, key: &Key) -> Result<Contest, StoreError>;

    /// Run a key-only query.
    ///
    /// Queries without [`ContestQuery::keys_only`] are
    /// [`StoreError::InvalidQuery`].
    async fn get_all(
        &self,
        ctx: &RequestContext,
        query: &ContestQuery,
    ) -> Result<Vec<Key>, StoreError>;

    /// Get several contests, one result per key in order.
    async fn get_multi(
        &self,
        ctx: &RequestContext,
        keys: &[Key],
    ) -> Vec<Result<Contest, StoreError>> {
        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            results.push(self.get(ctx, key).await);
        }
        results
    }
}

// ============================================================================
// MOCK STORE
// ============================================================================

/// In-memory store for tests and local runs.
///
/// Assigns ids to incomplete keys on insert, stamps timestamps on every
/// save, counts reads, and can be told to fail specific keys or queries.
#[derive(Debug, Default)]
pub struct MockContestStore {
    contests: RwLock<BTreeMap<Key, Contest>>,
    failing_keys: RwLock<HashMap<Key, StoreError>>,
    failing_queries: RwLock<Option<StoreError>>,
    next_id: AtomicI64,
    get_calls: AtomicUsize,
    query_calls: AtomicUsize,
}

impl MockContestStore {
    /// Create a new mock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist a contest, completing its key if needed.
    ///
    /// Returns the stored key.
    pub fn insert(&self, mut contest: Contest) -> Key {
        if contest.key.is_incomplete() {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            contest.key = contest.key.with_id(id);
        }
        contest.stamp(Utc::now());

        let key = contest.key.clone();
        self.contests
            .write()
            .unwrap()
            .insert(key.clone(), contest);
        key
    }

    /// Persist several contests, returning their keys in order.
    pub fn insert_all(&self, contests: impl IntoIterator<Item = Contest>) -> Vec<Key> {
        contests.into_iter().map(|c| self.insert(c)).collect()
    }

    /// Make every `get` of `key` fail with `error`.
    pub fn fail_key(&self, key: Key, error: StoreError) {
        self.failing_keys.write().unwrap().insert(key, error);
    }

    /// Make every query fail with `error`.
    pub fn fail_queries(&self, error: StoreError) {
        *self.failing_queries.write().unwrap() = Some(error);
    }

    /// Remove all injected failures.
    pub fn heal(&self) {
        self.failing_keys.write().unwrap().clear();
        *self.failing_queries.write().unwrap() = None;
    }

    /// Stored copy of a contest, bypassing counters and failures.
    pub fn peek(&self, key: &Key) -> Option<Contest> {
        self.contests.read().unwrap().get(key).cloned()
    }

    pub fn remove(&self, key: &Key) -> Option<Contest> {
        self.contests.write().unwrap().remove(key)
    }

    /// Number of `get` calls served so far.
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Number of `get_all` calls served so far.
    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    /// Get count of stored contests.
    pub fn len(&self) -> usize {
        self.contests.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContestStore for MockContestStore {
    async fn get(&self, ctx: &RequestContext, key: &Key) -> Result<Contest, StoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if ctx.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        if let Some(error) = self
            .failing_keys
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .get(key)
        {
            return Err(error.clone());
        }

        self.contests
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { key: key.clone() })
    }

    async fn get_all(
        &self,
        ctx: &RequestContext,
        query: &ContestQuery,
    ) -> Result<Vec<Key>, StoreError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if ctx.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        if let Some(error) = self
            .failing_queries
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .as_ref()
        {
            return Err(error.clone());
        }
        if !query.is_keys_only() {
            return Err(StoreError::InvalidQuery {
                reason: "get_all only serves keys-only queries".to_string(),
            });
        }

        let contests = self.contests.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(contests
            .values()
            .filter(|c| query.matches(c))
            .map(|c| c.key.clone())
            .collect())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::{contest_key, Category, GameResult};

    fn make_test_contest(owner: &Key, category: Category) -> Contest {
        Contest::new(
            0,
            owner,
            &GameResult {
                game_id: 11,
                category,
                r: 1620.0,
                rd: 80.0,
                outcome: 1.0,
            },
        )
    }

    #[test]
    fn test_insert_assigns_ids_and_timestamps() {
        let store = MockContestStore::new();
        let owner = Key::owner(1);

        let k1 = store.insert(make_test_contest(&owner, Category::Elo));
        let k2 = store.insert(make_test_contest(&owner, Category::Elo));

        assert!(!k1.is_incomplete());
        assert_ne!(k1, k2);
        assert_eq!(k1.parent(), Some(&owner));

        let stored = store.peek(&k1).unwrap();
        assert!(stored.created_at.is_some());
        assert!(stored.updated_at >= stored.created_at);
    }

    #[test]
    fn test_insert_keeps_complete_keys() {
        let store = MockContestStore::new();
        let owner = Key::owner(1);
        let mut contest = make_test_contest(&owner, Category::Elo);
        contest.key = contest_key(77, &owner);

        assert_eq!(store.insert(contest), contest_key(77, &owner));
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let store = MockContestStore::new();
        let ctx = RequestContext::new();
        let key = contest_key(5, &Key::owner(1));

        let err = store.get(&ctx, &key).await.unwrap_err();
        assert_eq!(err, StoreError::NotFound { key });
        assert_eq!(store.get_calls(), 1);
    }

    #[tokio::test]
    async fn test_get_all_is_ancestor_scoped() {
        let store = MockContestStore::new();
        let ctx = RequestContext::new();
        let owner = Key::owner(1);
        let other = Key::owner(2);

        let mine = store.insert(make_test_contest(&owner, Category::Elo));
        store.insert(make_test_contest(&other, Category::Elo));

        let keys = store
            .get_all(&ctx, &ContestQuery::new().ancestor(owner).keys_only())
            .await
            .unwrap();
        assert_eq!(keys, vec![mine]);
    }

    #[tokio::test]
    async fn test_get_multi_keeps_order() {
        let store = MockContestStore::new();
        let ctx = RequestContext::new();
        let owner = Key::owner(1);
        let a = store.insert(make_test_contest(&owner, Category::Elo));
        let b = store.insert(make_test_contest(&owner, Category::Tammany));
        let missing = contest_key(999, &owner);

        let results = store.get_multi(&ctx, &[b.clone(), missing, a.clone()]).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().key, b);
        assert!(matches!(results[1], Err(StoreError::NotFound { .. })));
        assert_eq!(results[2].as_ref().unwrap().key, a);
    }

    #[tokio::test]
    async fn test_injected_failures_and_heal() {
        let store = MockContestStore::new();
        let ctx = RequestContext::new();
        let key = store.insert(make_test_contest(&Key::owner(1), Category::Elo));

        store.fail_key(key.clone(), StoreError::DeadlineExceeded);
        store.fail_queries(StoreError::Unavailable {
            reason: "maintenance".to_string(),
        });
        assert_eq!(store.get(&ctx, &key).await, Err(StoreError::DeadlineExceeded));
        assert!(store.get_all(&ctx, &ContestQuery::new().keys_only()).await.is_err());

        store.heal();
        assert!(store.get(&ctx, &key).await.is_ok());
        assert_eq!(store.get_all(&ctx, &ContestQuery::new().keys_only()).await.unwrap(), vec![key]);
    }

    #[tokio::test]
    async fn test_get_all_requires_keys_only() {
        let store = MockContestStore::new();
        let ctx = RequestContext::new();
        store.insert(make_test_contest(&Key::owner(1), Category::Elo));

        let result = store.get_all(&ctx, &ContestQuery::new().applied(false)).await;
        assert!(matches!(result, Err(StoreError::InvalidQuery { .. })));
    }

    #[tokio::test]
    async fn test_get_all_filters_by_category_code() {
        let store = MockContestStore::new();
        let ctx = RequestContext::new();
        let owner = Key::owner(1);
        let elo = store.insert(make_test_contest(&owner, Category::Elo));
        store.insert(make_test_contest(&owner, Category::Indonesia));

        let query = ContestQuery::new()
            .ancestor(owner)
            .category(Category::from_code(6).unwrap())
            .keys_only();
        assert_eq!(store.get_all(&ctx, &query).await.unwrap(), vec![elo]);
    }

    #[tokio::test]
    async fn test_cancelled_context() {
        let store = MockContestStore::new();
        let ctx = RequestContext::new();
        let key = store.insert(make_test_contest(&Key::owner(1), Category::Elo));

        ctx.cancellation().cancel();
        assert_eq!(store.get(&ctx, &key).await, Err(StoreError::Cancelled));
        assert_eq!(
            store.get_all(&ctx, &ContestQuery::new().keys_only()).await,
            Err(StoreError::Cancelled)
        );
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
