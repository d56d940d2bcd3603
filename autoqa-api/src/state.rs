//! Shared application state for Axum routers.

use std::sync::Arc;

use autoqa_storage::{CachedTableReader, Clock, LinkSigner, TableScanner, TimeBucket};

use crate::config::AppConfig;
use crate::oidc::IdentityProvider;
use crate::session::SessionCodec;

/// Application-wide state shared across all routes.
///
/// Upstreams are trait objects so tests can swap in mocks.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: SessionCodec,
    /// Table reads, memoised per 600-second bucket.
    pub reports: Arc<CachedTableReader>,
    pub signer: Arc<dyn LinkSigner>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        scanner: Arc<dyn TableScanner>,
        signer: Arc<dyn LinkSigner>,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let sessions = SessionCodec::new(
            config.secret_key.clone(),
            config.session_max_age,
            config.session_https_only,
        );
        let reports = CachedTableReader::new(scanner, TimeBucket::default(), clock);

        Self {
            config: Arc::new(config),
            sessions,
            reports: Arc::new(reports),
            signer,
            identity,
        }
    }
}

crate::impl_from_ref!(Arc<AppConfig>, config);
crate::impl_from_ref!(SessionCodec, sessions);
crate::impl_from_ref!(Arc<CachedTableReader>, reports);
crate::impl_from_ref!(Arc<dyn LinkSigner>, signer);
crate::impl_from_ref!(Arc<dyn IdentityProvider>, identity);
