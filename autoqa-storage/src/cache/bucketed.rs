//! Keyed cache whose entries are only valid for one time bucket.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use super::bucket::TimeBucket;
use crate::clock::Clock;
use crate::error::StorageResult;

type Slot<V> = Arc<OnceCell<Arc<V>>>;

/// Hit/miss counters.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of fetches actually executed.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

/// Read-through cache keyed by `(name, bucket index)`.
///
/// Concurrent misses on the same key share a single fetch. A failed fetch
/// leaves the slot empty, so the next caller retries. Filling a slot in a
/// newer bucket drops every slot from older buckets.
pub struct BucketedCache<V> {
    bucket: TimeBucket,
    clock: Arc<dyn Clock>,
    slots: DashMap<(String, u64), Slot<V>>,
    stats: CacheStats,
}

impl<V> BucketedCache<V>
where
    V: Send + Sync,
{
    pub fn new(bucket: TimeBucket, clock: Arc<dyn Clock>) -> Self {
        Self {
            bucket,
            clock,
            slots: DashMap::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn bucket(&self) -> TimeBucket {
        self.bucket
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Number of live slots, including ones whose fetch failed.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Return the value cached for `key` in the current bucket, running
    /// `fetch` to fill it on a miss.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> StorageResult<Arc<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = StorageResult<V>>,
    {
        let index = self.bucket.index_at(self.clock.now_unix_secs());
        let slot = self
            .slots
            .entry((key.to_string(), index))
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        if let Some(value) = slot.get() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key, bucket = index, "Cache hit");
            return Ok(Arc::clone(value));
        }

        let mut fetched = false;
        let value = slot
            .get_or_try_init(|| {
                fetched = true;
                async move { fetch().await.map(Arc::new) }
            })
            .await?;

        if fetched {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key, bucket = index, "Cache miss, fetched");
            self.prune_before(index);
        } else {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
        }

        Ok(Arc::clone(value))
    }

    fn prune_before(&self, index: u64) {
        self.slots.retain(|(_, bucket), _| *bucket >= index);
    }
}
