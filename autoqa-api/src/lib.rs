//! AutoQA API - Session-Gated Report Dashboard
//!
//! Axum service that signs users in through an OpenID Connect provider,
//! lists platform and hullscrubber QA reports from the table store, and
//! redirects to time-limited signed links for report artifacts.
//!
//! Request flow: logging span, session cookie, auth gate (artifact routes
//! only), handler, then the cached table reader or link signer.

pub mod config;
pub mod error;
pub mod macros;
pub mod middleware;
pub mod oidc;
pub mod routes;
pub mod session;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::{AppConfig, OidcSettings};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{require_login, AuthGate};
pub use oidc::{IdentityProvider, OpenIdProvider, UserInfo};
pub use routes::create_app;
pub use routes::reports::{FlashMessage, IndexPage, MessageCategory};
pub use session::{
    session_middleware, PendingLogin, Session, SessionCodec, SessionHandle, SessionSecret,
    SESSION_COOKIE,
};
pub use state::AppState;
