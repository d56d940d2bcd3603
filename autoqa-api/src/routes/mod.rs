//! REST API Routes Module
//!
//! | Method | Path | Auth |
//! |---|---|---|
//! | GET | `/` | optional |
//! | GET | `/login`, `/login/callback`, `/logout` | none |
//! | GET | `/-/{locator}` | required |
//! | GET | `/static/*` | none |
//!
//! Every path carries the configured stage prefix.

pub mod artifacts;
pub mod auth;
pub mod reports;

use axum::{middleware::from_fn, middleware::from_fn_with_state, Router};
use tower_http::services::ServeDir;

use crate::middleware::AuthGate;
use crate::session::session_middleware;
use crate::state::AppState;
use crate::telemetry::request_logging_middleware;

/// Build the complete application router.
pub fn create_app(state: AppState) -> Router {
    let stage = state.config.stage.clone();
    let gate = AuthGate::new(state.config.login_path());

    Router::new()
        .merge(reports::create_router(&stage))
        .merge(auth::create_router(&stage))
        .merge(artifacts::create_router(&stage, &gate))
        .nest_service(
            &format!("{}/static", stage),
            ServeDir::new(&state.config.static_dir),
        )
        .layer(from_fn_with_state(state.sessions.clone(), session_middleware))
        .layer(from_fn(request_logging_middleware))
        .with_state(state)
}
