//! Time-bucketed read cache.
//!
//! Wall-clock time is cut into fixed windows ("buckets"). A cached value is
//! keyed by `(name, bucket index)`, so every read that lands in the same
//! window sees the same value, and the first read in a new window fetches
//! afresh. Staleness of up to one window is accepted.
//!
//! ```ignore
//! let cache = BucketedCache::new(TimeBucket::new(TABLE_SCAN_WINDOW), clock);
//! let rows = cache.get_or_fetch("etl-autoqa-results", || scanner.scan(table)).await?;
//! ```

pub mod bucket;
pub mod bucketed;

pub use bucket::{TimeBucket, TABLE_SCAN_WINDOW};
pub use bucketed::{BucketedCache, CacheStats};
