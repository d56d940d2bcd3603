//! Cached table reads.

use std::sync::Arc;

use async_trait::async_trait;
use autoqa_core::Row;

use crate::cache::{BucketedCache, CacheStats, TimeBucket};
use crate::clock::Clock;
use crate::error::StorageResult;

/// Full-table scan against the table store.
///
/// Implementations must follow pagination to the end and return every item
/// already unmarshalled into plain values.
#[async_trait]
pub trait TableScanner: Send + Sync {
    async fn scan(&self, table: &str) -> StorageResult<Vec<Row>>;
}

/// Returns all rows of a table, reusing the previous scan while it is still
/// within the current time bucket.
pub struct CachedTableReader {
    scanner: Arc<dyn TableScanner>,
    cache: BucketedCache<Vec<Row>>,
}

impl CachedTableReader {
    pub fn new(scanner: Arc<dyn TableScanner>, bucket: TimeBucket, clock: Arc<dyn Clock>) -> Self {
        Self {
            scanner,
            cache: BucketedCache::new(bucket, clock),
        }
    }

    /// Rows of `table`, in scan order.
    pub async fn read(&self, table: &str) -> StorageResult<Arc<Vec<Row>>> {
        self.cache
            .get_or_fetch(table, || self.scanner.scan(table))
            .await
            .inspect_err(|e| tracing::warn!(table, error = %e, "Table scan failed"))
    }

    pub fn stats(&self) -> &CacheStats {
        self.cache.stats()
    }
}
