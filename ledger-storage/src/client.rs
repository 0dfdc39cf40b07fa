//! Cache-aside contest client.
//!
//! Every read goes to the local cache first and falls back to the durable
//! store on a miss, warming the cache with what the store returned. Cache
//! trouble of any kind (absent entry, undecodable entry, backend failure)
//! only ever costs a store round trip; it is never reported to the caller.
//!
//! # Staleness
//!
//! A cache hit is returned as is and does not refresh the entry's expiry.
//! Until that entry expires (or is [invalidated](ContestClient::invalidate))
//! the cached copy masks the stored one, so callers must not assume the two
//! agree.

use std::sync::Arc;

use ledger_core::{
    CacheError, Category, Contest, ContestError, ContestMap, ContestResult, Key, RequestContext,
};
use tracing::{debug, warn};

use crate::batch::Batch;
use crate::cache::{CacheStats, LocalCache};
use crate::query::ContestQuery;
use crate::ContestStore;

/// Resolves contests through a local cache backed by a durable store.
///
/// # Type Parameters
///
/// - `S`: the durable store queried on cache miss
/// - `C`: the local cache backend
pub struct ContestClient<S, C>
where
    S: ContestStore,
    C: LocalCache,
{
    store: Arc<S>,
    cache: Arc<C>,
}

impl<S, C> ContestClient<S, C>
where
    S: ContestStore,
    C: LocalCache,
{
    pub fn new(store: Arc<S>, cache: Arc<C>) -> Self {
        Self { store, cache }
    }

    /// Get a reference to the durable store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get a reference to the cache backend.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    // ========================================================================
    // SINGLE KEY
    // ========================================================================

    /// Resolve one contest, cache first.
    ///
    /// Fails with [`ContestError::MissingKey`] when `key` is `None`, and
    /// with the store's error when the cache misses and the store fails.
    pub async fn resolve(&self, ctx: &RequestContext, key: Option<&Key>) -> ContestResult<Contest> {
        let key = key.ok_or(ContestError::MissingKey)?;
        debug!(request_id = %ctx.request_id(), key = %key, "Resolving contest");

        match self.cache_get(key).await {
            Ok(contest) => {
                debug!(request_id = %ctx.request_id(), key = %key, "Cache hit");
                return Ok(contest);
            }
            Err(ContestError::InvalidCache { reason, .. }) => {
                warn!(
                    request_id = %ctx.request_id(),
                    key = %key,
                    reason = %reason,
                    "Invalid cached value, falling back to store"
                );
            }
            Err(_) => {
                debug!(request_id = %ctx.request_id(), key = %key, "Cache miss");
            }
        }

        self.store_get(ctx, key).await
    }

    /// Look a key up in the local cache only.
    ///
    /// Fails with `NotFound` on a miss and `InvalidCache` when the entry
    /// cannot be decoded or belongs to another key.
    async fn cache_get(&self, key: &Key) -> ContestResult<Contest> {
        let encoded = key.encode();
        let bytes = match self.cache.get(&encoded).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Err(ContestError::NotFound { key: key.clone() }),
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed");
                return Err(ContestError::NotFound { key: key.clone() });
            }
        };

        let contest: Contest =
            serde_json::from_slice(&bytes).map_err(|e| ContestError::InvalidCache {
                key: key.clone(),
                reason: e.to_string(),
            })?;
        if contest.key != *key {
            return Err(ContestError::InvalidCache {
                key: key.clone(),
                reason: format!("entry holds contest {}", contest.key),
            });
        }
        Ok(contest)
    }

    /// Fetch from the store and warm the cache.
    async fn store_get(&self, ctx: &RequestContext, key: &Key) -> ContestResult<Contest> {
        let contest = self.store.get(ctx, key).await?;

        if let Err(e) = self.cache_put(key, &contest).await {
            warn!(request_id = %ctx.request_id(), key = %key, error = %e, "Cache write failed");
        }
        Ok(contest)
    }

    async fn cache_put(&self, key: &Key, contest: &Contest) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(contest).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        self.cache.set_default(&key.encode(), bytes).await
    }

    // ========================================================================
    // BATCH
    // ========================================================================

    /// Resolve every key in order, one attempt each.
    ///
    /// Slot `i` of the returned batch is the outcome for `keys[i]`.
    pub async fn resolve_multi(&self, ctx: &RequestContext, keys: &[Key]) -> Batch {
        debug!(request_id = %ctx.request_id(), keys = keys.len(), "Resolving contests");

        let mut slots = Vec::with_capacity(keys.len());
        for key in keys {
            slots.push(self.resolve(ctx, Some(key)).await);
        }
        let batch = Batch::new(slots);

        if let Some((index, error)) = batch.first_error() {
            debug!(
                request_id = %ctx.request_id(),
                first_failed = index,
                error = %error,
                "Batch resolved with failures"
            );
        }
        batch
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Unapplied contests of `owner` in one category.
    ///
    /// No pending contests is a normal state and yields an empty vec.
    pub async fn unapplied_for(
        &self,
        ctx: &RequestContext,
        owner: &Key,
        category: Category,
    ) -> ContestResult<Vec<Contest>> {
        debug!(
            request_id = %ctx.request_id(),
            owner = %owner,
            category = %category,
            "Querying unapplied contests"
        );

        let query = ContestQuery::new()
            .ancestor(owner.clone())
            .applied(false)
            .category(category)
            .keys_only();

        let keys = self.store.get_all(ctx, &query).await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self.resolve_multi(ctx, &keys).await.into_result()?)
    }

    /// All unapplied contests of `owner`, grouped by category and flagged
    /// applied.
    ///
    /// The flag is only set on the returned copies; persisting it is up to
    /// the caller.
    pub async fn unapplied(&self, ctx: &RequestContext, owner: &Key) -> ContestResult<ContestMap> {
        debug!(request_id = %ctx.request_id(), owner = %owner, "Querying unapplied contests");

        let query = ContestQuery::new()
            .ancestor(owner.clone())
            .applied(false)
            .keys_only();

        let keys = self.store.get_all(ctx, &query).await?;
        if keys.is_empty() {
            return Ok(ContestMap::new());
        }

        let contests = self.resolve_multi(ctx, &keys).await.into_result()?;

        let mut grouped = ContestMap::new();
        for mut contest in contests {
            contest.mark_applied();
            grouped.entry(contest.category).or_default().push(contest);
        }

        debug!(
            request_id = %ctx.request_id(),
            owner = %owner,
            categories = grouped.len(),
            contests = keys.len(),
            "Grouped unapplied contests"
        );
        Ok(grouped)
    }

    // ========================================================================
    // CACHE MAINTENANCE
    // ========================================================================

    /// Drop the cached copy of a contest.
    ///
    /// Typically called after persisting an applied flag so the next read
    /// sees the stored value. Returns whether an entry was removed.
    pub async fn invalidate(&self, ctx: &RequestContext, key: &Key) -> ContestResult<bool> {
        debug!(request_id = %ctx.request_id(), key = %key, "Invalidating cached contest");
        Ok(self.cache.delete(&key.encode()).await?)
    }

    /// Get cache statistics.
    pub async fn cache_stats(&self) -> ContestResult<CacheStats> {
        Ok(self.cache.stats().await?)
    }
}

impl<S, C> Clone for ContestClient<S, C>
where
    S: ContestStore,
    C: LocalCache,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
        }
    }
}
