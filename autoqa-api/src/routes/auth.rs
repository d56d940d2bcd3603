//! Login Routes Module
//!
//! The session moves `Anonymous -> PendingProvider -> Authenticated`:
//!
//! 1. `/login` - stores a fresh state/nonce in the session, redirects to the provider
//! 2. `/login/callback` - verifies the provider response, marks the session authenticated
//! 3. `/logout` - clears the authenticated flag
//!
//! ```text
//! 1. Anonymous user hits a gated path, gate stores it in redirect_to
//! 2. /login redirects to the provider authorization URL
//! 3. Provider redirects back to /login/callback?code=...&state=...
//! 4. Server exchanges the code, checks email_verified
//! 5. Server redirects to redirect_to (consumed) or the index
//! ```

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::Redirect,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::config::AppConfig;
use crate::error::{ApiError, ApiResult};
use crate::session::{PendingLogin, SessionHandle};
use crate::state::AppState;

/// Query parameters on the provider's return leg.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Absolute callback URL registered with the provider.
///
/// Uses `PUBLIC_BASE_URL` when configured, otherwise the request's
/// `X-Forwarded-Proto` and `Host` headers.
pub fn callback_url(config: &AppConfig, headers: &HeaderMap) -> ApiResult<String> {
    let origin = match &config.public_base_url {
        Some(base) => base.clone(),
        None => {
            let host = headers
                .get(header::HOST)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| ApiError::invalid_input("Missing Host header"))?;
            let scheme = headers
                .get("x-forwarded-proto")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("http");
            format!("{}://{}", scheme, host)
        }
    };
    Ok(format!("{}{}", origin, config.callback_path()))
}

/// GET /login
pub async fn login(
    State(state): State<AppState>,
    session: SessionHandle,
    headers: HeaderMap,
) -> ApiResult<Redirect> {
    let redirect_uri = callback_url(&state.config, &headers)?;
    let pending = PendingLogin::generate();

    let url = state
        .identity
        .authorization_url(&redirect_uri, &pending.state, &pending.nonce)
        .await?;

    session.update(|s| s.pending_login = Some(pending)).await;
    tracing::debug!(redirect_uri = %redirect_uri, "Redirecting to identity provider");

    Ok(Redirect::temporary(&url))
}

/// GET /login/callback
pub async fn login_callback(
    State(state): State<AppState>,
    session: SessionHandle,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> ApiResult<Redirect> {
    let debug = state.config.debug;

    // One attempt per /login, whatever the outcome.
    let pending = session.update(|s| s.pending_login.take()).await;

    if let Some(error) = params.error {
        tracing::info!(error = %error, description = ?params.error_description, "Provider denied login");
        return Err(ApiError::unauthorized("Could not validate credentials")
            .with_debug_cause(debug, error));
    }

    let pending = pending.ok_or_else(|| ApiError::invalid_input("No login in progress"))?;
    if params.state.as_deref() != Some(pending.state.as_str()) {
        tracing::warn!("Login callback state mismatch");
        return Err(ApiError::invalid_input("Login state mismatch"));
    }
    let code = params.code.ok_or_else(|| ApiError::missing_field("code"))?;

    let redirect_uri = callback_url(&state.config, &headers)?;
    let user = state
        .identity
        .exchange_code(&code, &redirect_uri, &pending.nonce)
        .await?;

    if !user.email_verified {
        tracing::info!(sub = %user.sub, email = ?user.email, "Rejected login with unverified email");
        return Err(ApiError::unauthorized("Could not validate credentials"));
    }

    let target = session
        .update(|s| {
            s.authenticated = true;
            s.redirect_to.take()
        })
        .await
        .unwrap_or_else(|| state.config.index_path());

    tracing::info!(sub = %user.sub, email = ?user.email, "User logged in");
    Ok(Redirect::temporary(&target))
}

/// GET /logout
pub async fn logout(State(state): State<AppState>, session: SessionHandle) -> Redirect {
    session.update(|s| s.authenticated = false).await;
    Redirect::temporary(&state.config.index_path())
}

/// Create the login routes under `stage`.
pub fn create_router(stage: &str) -> Router<AppState> {
    Router::new()
        .route(&format!("{}/login", stage), get(login))
        .route(&format!("{}/login/callback", stage), get(login_callback))
        .route(&format!("{}/logout", stage), get(logout))
}
