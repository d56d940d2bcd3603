//! Signed-link generation seam.

use std::time::Duration;

use async_trait::async_trait;
use autoqa_core::ObjectRef;

use crate::error::StorageResult;

/// Mints time-limited URLs granting anonymous read access to one object.
///
/// No caching: every call produces a fresh link.
#[async_trait]
pub trait LinkSigner: Send + Sync {
    async fn presign(&self, object: &ObjectRef, expires_in: Duration) -> StorageResult<String>;
}
