//! Auth Gate Middleware
//!
//! Routes wrapped by [`AuthGate::guard`] only run for authenticated sessions.
//! Anonymous requests are answered with a temporary redirect to the login
//! entry point, after recording the requested path in `redirect_to` so the
//! callback can send the user back.
//!
//! The gate must run inside [`crate::session::session_middleware`].

use axum::{
    extract::{OriginalUri, Request, State},
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Redirect, Response},
    Router,
};
use std::sync::Arc;

use crate::session::SessionHandle;

/// Requires an authenticated session for the routes it guards.
#[derive(Debug, Clone)]
pub struct AuthGate {
    login_path: Arc<str>,
}

impl AuthGate {
    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            login_path: Arc::from(login_path.into()),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Wrap every route of `router` with the gate.
    ///
    /// Uses `route_layer` so unmatched paths still fall through to 404.
    pub fn guard<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.route_layer(from_fn_with_state(self.clone(), require_login))
    }
}

/// Gate middleware: delegate when authenticated, otherwise remember the path
/// and redirect to login.
pub async fn require_login(
    State(gate): State<AuthGate>,
    OriginalUri(uri): OriginalUri,
    session: SessionHandle,
    request: Request,
    next: Next,
) -> Response {
    if session.is_authenticated().await {
        return next.run(request).await;
    }

    let path = uri.path().to_string();
    tracing::debug!(path = %path, "Anonymous request, redirecting to login");
    session.update(|s| s.redirect_to = Some(path)).await;

    Redirect::temporary(gate.login_path()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{session_middleware, Session, SessionCodec, SessionSecret};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        middleware,
        routing::get,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt; // for `oneshot`

    fn codec() -> SessionCodec {
        SessionCodec::new(
            SessionSecret::new("gate-secret".to_string()),
            Duration::from_secs(600),
            false,
        )
    }

    fn test_app(hits: Arc<AtomicUsize>) -> Router {
        let gate = AuthGate::new("/login");
        let protected = gate.guard(Router::new().route(
            "/-/*locator",
            get(move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    "artifact"
                }
            }),
        ));

        Router::new()
            .route("/", get(|| async { "index" }))
            .merge(protected)
            .layer(middleware::from_fn_with_state(codec(), session_middleware))
    }

    fn session_from(response: &Response) -> Session {
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        let value = set_cookie
            .trim_start_matches("session=")
            .split(';')
            .next()
            .unwrap();
        codec().decode(value).unwrap()
    }

    #[tokio::test]
    async fn test_anonymous_request_redirects_and_remembers_path() {
        let hits = Arc::new(AtomicUsize::new(0));
        let request = Request::builder()
            .uri("/-/reports/run-1/summary.json?download=1")
            .body(Body::empty())
            .unwrap();

        let response = test_app(hits.clone()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/login");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(
            session_from(&response).redirect_to.as_deref(),
            Some("/-/reports/run-1/summary.json")
        );
    }

    #[tokio::test]
    async fn test_authenticated_request_passes_through() {
        let hits = Arc::new(AtomicUsize::new(0));
        let cookie = codec()
            .encode(&Session {
                authenticated: true,
                ..Session::default()
            })
            .unwrap();
        let request = Request::builder()
            .uri("/-/reports/x.json")
            .header(header::COOKIE, format!("session={}", cookie))
            .body(Body::empty())
            .unwrap();

        let response = test_app(hits.clone()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        // Re-issued to keep the session alive, contents unchanged.
        let refreshed = session_from(&response);
        assert!(refreshed.authenticated);
        assert_eq!(refreshed.redirect_to, None);
    }

    #[tokio::test]
    async fn test_unguarded_route_is_untouched() {
        let hits = Arc::new(AtomicUsize::new(0));
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = test_app(hits).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }
}
