//! Ledger Test Utilities
//!
//! Shared test infrastructure for the ledger workspace:
//! - A cache mock with failure injection
//! - Proptest generators for keys, game results and contests
//! - Fixtures for common owners and games
//! - Assertions for ledger-specific error shapes

// Re-export in-memory backends from their source crate
pub use ledger_storage::{
    CacheStats, ContestClient, LocalCache, MemoryCache, MockContestStore,
};

// Re-export core types for convenience
pub use ledger_core::{
    contest_key, gen_contests, Category, Contest, ContestError, ContestMap, ContestResult,
    GameResult, Key, LedgerConfig, Places, RequestContext, ResultsMap, StoreError, Timestamp,
};
pub use ledger_core::CacheError;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

// ============================================================================
// MOCK PROVIDERS
// ============================================================================

/// Memory cache that can be told to fail reads or writes.
///
/// Failed calls never reach the wrapped cache, so a failed write leaves no
/// entry behind.
#[derive(Debug)]
pub struct MockCache {
    inner: MemoryCache,
    failing_reads: RwLock<Option<CacheError>>,
    failing_writes: RwLock<Option<CacheError>>,
    get_calls: AtomicUsize,
    set_calls: AtomicUsize,
}

impl MockCache {
    pub fn new() -> Self {
        Self {
            inner: MemoryCache::new(Duration::from_secs(60), 128),
            failing_reads: RwLock::new(None),
            failing_writes: RwLock::new(None),
            get_calls: AtomicUsize::new(0),
            set_calls: AtomicUsize::new(0),
        }
    }

    /// Make every `get` fail with `error`.
    pub fn fail_reads(&self, error: CacheError) {
        *self.failing_reads.write().unwrap() = Some(error);
    }

    /// Make every `set_default` fail with `error`.
    pub fn fail_writes(&self, error: CacheError) {
        *self.failing_writes.write().unwrap() = Some(error);
    }

    /// Remove all injected failures.
    pub fn heal(&self) {
        *self.failing_reads.write().unwrap() = None;
        *self.failing_writes.write().unwrap() = None;
    }

    /// The wrapped cache, bypassing failures and counters.
    pub fn backing(&self) -> &MemoryCache {
        &self.inner
    }

    /// Number of `get` calls, failed ones included.
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Number of `set_default` calls, failed ones included.
    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocalCache for MockCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failing_reads.read().unwrap().clone() {
            return Err(error);
        }
        self.inner.get(key).await
    }

    async fn set_default(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failing_writes.read().unwrap().clone() {
            return Err(error);
        }
        self.inner.set_default(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        self.inner.delete(key).await
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        self.inner.stats().await
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for ledger types.

    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    /// Generate any category.
    pub fn arb_category() -> impl Strategy<Value = Category> {
        prop::sample::select(Category::ALL.to_vec())
    }

    /// Generate a complete owner key.
    pub fn arb_owner_key() -> impl Strategy<Value = Key> {
        (1i64..1_000_000).prop_map(Key::owner)
    }

    /// Generate a complete contest key under `owner`.
    pub fn arb_contest_key(owner: Key) -> impl Strategy<Value = Key> {
        (1i64..1_000_000).prop_map(move |id| contest_key(id, &owner))
    }

    /// Generate a Timestamp within 2020-2030.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
        })
    }

    /// Generate a win, draw or loss.
    pub fn arb_outcome() -> impl Strategy<Value = f64> {
        prop_oneof![Just(1.0), Just(0.5), Just(0.0)]
    }

    /// Generate one participant's result.
    pub fn arb_game_result() -> impl Strategy<Value = GameResult> {
        (
            1i64..100_000,
            arb_category(),
            100.0f64..3000.0,
            30.0f64..350.0,
            arb_outcome(),
        )
            .prop_map(|(game_id, category, r, rd, outcome)| GameResult {
                game_id,
                category,
                r,
                rd,
                outcome,
            })
    }

    /// Generate an unsaved contest for `owner`.
    ///
    /// The key is incomplete; stores assign the id on insert.
    pub fn arb_contest(owner: Key) -> impl Strategy<Value = Contest> {
        (arb_game_result(), any::<bool>()).prop_map(move |(result, applied)| {
            let mut contest = Contest::new(0, &owner, &result);
            contest.applied = applied;
            contest
        })
    }

    /// Generate the results of one game: up to four placements, each with
    /// up to three owners.
    pub fn arb_places() -> impl Strategy<Value = Places> {
        let results = prop::collection::hash_map(
            arb_owner_key(),
            prop::collection::vec(arb_game_result(), 1..3),
            0..4,
        );
        prop::collection::vec(results, 0..5)
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common scenarios.

    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    /// Create a config suitable for tests: short expiry, small cache.
    pub fn test_config() -> LedgerConfig {
        LedgerConfig::default()
            .with_ttl(Duration::from_secs(60))
            .with_max_entries(128)
    }

    /// Create a client over a fresh mock store and a failure-injecting cache.
    pub fn mock_cache_client() -> ContestClient<MockContestStore, MockCache> {
        ContestClient::new(Arc::new(MockContestStore::new()), Arc::new(MockCache::new()))
    }

    /// Create a client over a fresh mock store and memory cache.
    pub fn memory_client() -> ContestClient<MockContestStore, MemoryCache> {
        let config = test_config();
        ContestClient::new(
            Arc::new(MockContestStore::new()),
            Arc::new(MemoryCache::from_config(&config)),
        )
    }

    /// A result in `category` for the given game.
    pub fn game_result(game_id: i64, category: Category, outcome: f64) -> GameResult {
        GameResult {
            game_id,
            category,
            r: 1500.0,
            rd: 350.0,
            outcome,
        }
    }

    /// An unsaved, unapplied contest for `owner`.
    pub fn pending_contest(owner: &Key, category: Category) -> Contest {
        Contest::new(0, owner, &game_result(1, category, 1.0))
    }

    /// A two-player game with a winner and a loser.
    pub fn two_player_game(game_id: i64, winner: &Key, loser: &Key) -> Places {
        let mut first = ResultsMap::new();
        first.insert(winner.clone(), vec![game_result(game_id, Category::Elo, 1.0)]);

        let mut second = ResultsMap::new();
        second.insert(loser.clone(), vec![game_result(game_id, Category::Elo, 0.0)]);

        vec![first, second]
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for ledger error shapes.

    use super::*;

    /// Assert that a result is Ok.
    pub fn assert_ok<T: std::fmt::Debug>(result: &ContestResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got {:?}", result);
    }

    /// Assert that a result is a store-level not-found.
    pub fn assert_not_found<T: std::fmt::Debug>(result: &ContestResult<T>) {
        assert!(
            matches!(result, Err(e) if e.is_not_found()),
            "Expected not found, got {:?}",
            result
        );
    }

    /// Assert that a result is a partial batch failure with failures at
    /// exactly `positions`.
    pub fn assert_batch_failures<T: std::fmt::Debug>(result: &ContestResult<T>, positions: &[usize]) {
        match result {
            Err(ContestError::Batch(batch)) => {
                let failed: Vec<usize> = batch.errors().failures().map(|(i, _)| i).collect();
                assert_eq!(failed, positions, "Unexpected failed positions in {}", batch);
            }
            other => panic!("Expected batch error, got {:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::generators::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_arb_contest_is_incomplete_child(
            (owner, contest) in arb_owner_key()
                .prop_flat_map(|owner| (Just(owner.clone()), arb_contest(owner)))
        ) {
            prop_assert!(contest.key.is_incomplete());
            prop_assert_eq!(contest.owner(), Some(&owner));
        }
    }

    #[tokio::test]
    async fn test_mock_cache_failures_and_heal() {
        let cache = MockCache::new();
        cache.fail_writes(CacheError::Backend {
            reason: "disk full".to_string(),
        });
        assert!(cache.set_default("k", b"v".to_vec()).await.is_err());
        assert!(cache.backing().is_empty());

        cache.heal();
        cache.set_default("k", b"v".to_vec()).await.unwrap();
        cache.fail_reads(CacheError::Backend {
            reason: "closed".to_string(),
        });
        assert!(cache.get("k").await.is_err());
        assert_eq!(cache.get_calls(), 1);
        assert_eq!(cache.set_calls(), 2);
    }

    #[test]
    fn test_two_player_game_fixture() {
        let winner = Key::owner(1);
        let loser = Key::owner(2);
        let contests = gen_contests(&fixtures::two_player_game(7, &winner, &loser));

        assert_eq!(contests.len(), 2);
        assert!(contests.iter().all(|c| c.game_id == 7));
    }
}
