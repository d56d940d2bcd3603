//! Per-call deadlines for upstream requests.

use std::future::Future;
use std::time::Duration;

use crate::error::{StorageError, StorageResult};

/// Run `fut`, failing with [`StorageError::Timeout`] if it does not finish
/// within `after`.
pub async fn with_timeout<T, F>(operation: &'static str, after: Duration, fut: F) -> StorageResult<T>
where
    F: Future<Output = StorageResult<T>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, ?after, "Upstream call timed out");
            Err(StorageError::Timeout { operation, after })
        }
    }
}
