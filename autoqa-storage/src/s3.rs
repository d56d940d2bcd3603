//! S3 presigned-GET link signer.

use std::time::Duration;

use async_trait::async_trait;
use autoqa_core::ObjectRef;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;

use crate::deadline::with_timeout;
use crate::error::{StorageError, StorageResult};
use crate::signer::LinkSigner;

/// Lifetime of a signed artifact link.
pub const SIGNED_LINK_TTL: Duration = Duration::from_secs(3600);

/// Generates presigned `GetObject` URLs.
#[derive(Debug, Clone)]
pub struct S3LinkSigner {
    client: Client,
    timeout: Duration,
}

impl S3LinkSigner {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl LinkSigner for S3LinkSigner {
    async fn presign(&self, object: &ObjectRef, expires_in: Duration) -> StorageResult<String> {
        let config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::InvalidConfig(e.to_string()))?;

        let request = with_timeout("s3 presign", self.timeout, async {
            self.client
                .get_object()
                .bucket(&object.bucket)
                .key(&object.key)
                .presigned(config)
                .await
                .map_err(|e| StorageError::upstream("s3", DisplayErrorContext(&e).to_string()))
        })
        .await?;

        tracing::debug!(%object, ?expires_in, "Presigned object link");
        Ok(request.uri().to_string())
    }
}
