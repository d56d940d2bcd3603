//! Artifact Link Route
//!
//! `GET /-/{locator}` turns a storage locator into a short-lived signed link
//! and redirects to it. Only objects in the configured reports bucket are
//! ever signed; the bucket check runs before any call to the object store.

use axum::{
    extract::{Path, State},
    response::Redirect,
    routing::get,
    Router,
};
use std::sync::Arc;

use autoqa_core::StorageLocator;
use autoqa_storage::{LinkSigner, SIGNED_LINK_TTL};

use crate::config::AppConfig;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthGate;
use crate::state::AppState;

/// GET /-/{locator}
pub async fn artifact_redirect(
    State(config): State<Arc<AppConfig>>,
    State(signer): State<Arc<dyn LinkSigner>>,
    Path(locator): Path<String>,
) -> ApiResult<Redirect> {
    let object = StorageLocator::parse(&locator).resolve(&config.reports_bucket);

    if object.bucket != config.reports_bucket {
        tracing::warn!(locator = %locator, bucket = %object.bucket, "Refusing link outside the reports bucket");
        return Err(ApiError::forbidden("Permission Denied"));
    }
    if object.key.is_empty() {
        return Err(ApiError::invalid_input("Locator does not name an object"));
    }

    match signer.presign(&object, SIGNED_LINK_TTL).await {
        Ok(url) => {
            tracing::debug!(object = %object, "Redirecting to signed link");
            Ok(Redirect::temporary(&url))
        }
        Err(e) => {
            tracing::warn!(object = %object, error = %e, "Unable to sign artifact link");
            Err(ApiError::too_many_requests("Unable to generate presigned URL")
                .with_debug_cause(config.debug, e))
        }
    }
}

/// Create the artifact routes under `stage`, all behind `gate`.
pub fn create_router(stage: &str, gate: &AuthGate) -> Router<AppState> {
    gate.guard(Router::new().route(&format!("{}/-/*locator", stage), get(artifact_redirect)))
}
