//! Fixed-width time windows used as cache key components.

use std::time::Duration;

/// Freshness window for table scans.
pub const TABLE_SCAN_WINDOW: Duration = Duration::from_secs(600);

/// Maps a point in time to the index of the window containing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBucket {
    width_secs: u64,
}

impl TimeBucket {
    /// Create a bucketing strategy with the given window width.
    ///
    /// Widths under one second are rounded up to one second.
    pub fn new(width: Duration) -> Self {
        Self {
            width_secs: width.as_secs().max(1),
        }
    }

    pub fn width(&self) -> Duration {
        Duration::from_secs(self.width_secs)
    }

    /// `floor(now / width)`.
    pub fn index_at(&self, unix_secs: u64) -> u64 {
        unix_secs / self.width_secs
    }
}

impl Default for TimeBucket {
    fn default() -> Self {
        Self::new(TABLE_SCAN_WINDOW)
    }
}
