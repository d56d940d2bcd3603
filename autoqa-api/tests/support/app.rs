//! Shared harness for router-level tests.
//!
//! Builds the full application router over mock upstreams and offers helpers
//! for sending requests with a session cookie and reading the cookie back.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use autoqa_api::{
    create_app, ApiError, ApiResult, AppConfig, AppState, IdentityProvider, Session, SessionCodec,
    UserInfo, SESSION_COOKIE,
};
use autoqa_test_utils::{ManualClock, MockLinkSigner, MockTableScanner};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde::de::DeserializeOwned;
use tower::ServiceExt; // for `oneshot`

pub const PLATFORM_TABLE: &str = "etl-autoqa-results";
pub const HULLSCRUBBER_TABLE: &str = "etl-hullscrubber-qa-results";

// ============================================================================
// MOCK IDENTITY PROVIDER
// ============================================================================

/// Identity provider answering every code exchange with a fixed outcome.
pub struct MockIdentityProvider {
    outcome: Result<UserInfo, ApiError>,
    exchanges: Mutex<Vec<(String, String, String)>>,
}

impl MockIdentityProvider {
    pub fn verified(email: &str) -> Self {
        Self::returning(Ok(user(email, true)))
    }

    pub fn unverified(email: &str) -> Self {
        Self::returning(Ok(user(email, false)))
    }

    pub fn unreachable() -> Self {
        Self::returning(Err(ApiError::upstream_error("Identity provider request failed")))
    }

    fn returning(outcome: Result<UserInfo, ApiError>) -> Self {
        Self {
            outcome,
            exchanges: Mutex::new(Vec::new()),
        }
    }

    /// Recorded `(code, redirect_uri, nonce)` triples.
    pub fn exchanges(&self) -> Vec<(String, String, String)> {
        self.exchanges.lock().unwrap().clone()
    }
}

fn user(email: &str, verified: bool) -> UserInfo {
    UserInfo {
        sub: format!("sub-{}", email),
        email: Some(email.to_string()),
        email_verified: verified,
        name: Some("QA Tester".to_string()),
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn authorization_url(
        &self,
        redirect_uri: &str,
        state: &str,
        nonce: &str,
    ) -> ApiResult<String> {
        Ok(format!(
            "https://idp.test/authorize?state={}&nonce={}&redirect_uri={}",
            state, nonce, redirect_uri
        ))
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        nonce: &str,
    ) -> ApiResult<UserInfo> {
        self.exchanges.lock().unwrap().push((
            code.to_string(),
            redirect_uri.to_string(),
            nonce.to_string(),
        ));
        self.outcome.clone()
    }
}

// ============================================================================
// TEST APP
// ============================================================================

pub struct TestApp {
    pub router: Router,
    pub config: Arc<AppConfig>,
    pub codec: SessionCodec,
    pub scanner: Arc<MockTableScanner>,
    pub signer: Arc<MockLinkSigner>,
    pub identity: Arc<MockIdentityProvider>,
    pub clock: Arc<ManualClock>,
}

pub struct TestAppBuilder {
    env: HashMap<String, String>,
    scanner: MockTableScanner,
    signer: MockLinkSigner,
    identity: MockIdentityProvider,
    now_secs: u64,
}

impl TestAppBuilder {
    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn scanner(mut self, scanner: MockTableScanner) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn signer(mut self, signer: MockLinkSigner) -> Self {
        self.signer = signer;
        self
    }

    pub fn identity(mut self, identity: MockIdentityProvider) -> Self {
        self.identity = identity;
        self
    }

    pub fn build(self) -> TestApp {
        let env = self.env;
        let config = AppConfig::from_lookup(|name| env.get(name).cloned()).unwrap();

        let scanner = Arc::new(self.scanner);
        let signer = Arc::new(self.signer);
        let identity = Arc::new(self.identity);
        let clock = Arc::new(ManualClock::new(self.now_secs));

        let state = AppState::new(
            config,
            scanner.clone(),
            signer.clone(),
            identity.clone(),
            clock.clone(),
        );
        let config = state.config.clone();
        let codec = state.sessions.clone();

        TestApp {
            router: create_app(state),
            config,
            codec,
            scanner,
            signer,
            identity,
            clock,
        }
    }
}

impl TestApp {
    pub fn builder() -> TestAppBuilder {
        let env = [
            ("SECRET_KEY", "integration-secret"),
            ("GOOGLE_CLIENT_ID", "client-id"),
            ("GOOGLE_CLIENT_SECRET", "client-secret"),
            ("PUBLIC_BASE_URL", "https://qa.example.com"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        TestAppBuilder {
            env,
            scanner: MockTableScanner::new(),
            signer: MockLinkSigner::new(),
            identity: MockIdentityProvider::verified("qa@etl.farm"),
            now_secs: 1_700_000_000,
        }
    }

    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Send a GET, optionally carrying `session` as the cookie.
    pub async fn get(&self, uri: &str, session: Option<&Session>) -> Response {
        let mut request = Request::builder().uri(uri);
        if let Some(session) = session {
            request = request.header(header::COOKIE, self.cookie(session));
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub fn cookie(&self, session: &Session) -> String {
        format!("{}={}", SESSION_COOKIE, self.codec.encode(session).unwrap())
    }

    /// Session written by `response`, if it set one. An expired cookie
    /// reads as the empty session.
    pub fn written_session(&self, response: &Response) -> Option<Session> {
        let set_cookie = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
        if set_cookie.contains("Max-Age=0") {
            return Some(Session::default());
        }
        let value = set_cookie
            .strip_prefix(&format!("{}=", SESSION_COOKIE))?
            .split(';')
            .next()?;
        self.codec.decode(value)
    }
}

pub fn authenticated() -> Session {
    Session {
        authenticated: true,
        ..Session::default()
    }
}

pub fn location(response: &Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

pub async fn json_body<T: DeserializeOwned>(response: Response) -> T {
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
