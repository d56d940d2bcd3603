//! Signed Client-Side Session
//!
//! The session lives entirely in the `session` cookie:
//!
//! ```text
//! base64url(json) "." issued_at "." base64url(HMAC-SHA256(secret, base64url(json) "." issued_at))
//! ```
//!
//! A cookie that fails verification, cannot be parsed, or is older than the
//! configured max age decodes to the empty (anonymous) session. Decoding never
//! produces an error response.
//!
//! A non-empty session is re-issued on every response, so its max age counts
//! from the last request rather than from login.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::error::{ApiError, ApiResult};

type HmacSha256 = Hmac<Sha256>;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session";

// ============================================================================
// SECRET
// ============================================================================

/// Session signing key. Never printed.
#[derive(Clone)]
pub struct SessionSecret(SecretString);

impl SessionSecret {
    pub fn new(secret: String) -> Self {
        Self(SecretString::new(secret.into()))
    }

    fn expose(&self) -> &[u8] {
        self.0.expose_secret().as_bytes()
    }
}

impl std::fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionSecret([REDACTED])")
    }
}

// ============================================================================
// SESSION MODEL
// ============================================================================

/// Provider round-trip values kept between `/login` and `/login/callback`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLogin {
    pub state: String,
    pub nonce: String,
}

impl PendingLogin {
    /// Fresh random state and nonce.
    pub fn generate() -> Self {
        Self {
            state: random_token(),
            nonce: random_token(),
        }
    }
}

fn random_token() -> String {
    let mut bytes = [0u8; 24];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Per-visitor session state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub authenticated: bool,

    /// Path to return to once login completes. Consumed once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_login: Option<PendingLogin>,
}

impl Session {
    pub fn is_empty(&self) -> bool {
        *self == Session::default()
    }
}

// ============================================================================
// CODEC
// ============================================================================

/// Signs, verifies and renders session cookies.
#[derive(Debug, Clone)]
pub struct SessionCodec {
    secret: SessionSecret,
    max_age: Duration,
    secure: bool,
}

impl SessionCodec {
    pub fn new(secret: SessionSecret, max_age: Duration, secure: bool) -> Self {
        Self {
            secret,
            max_age,
            secure,
        }
    }

    fn mac(&self) -> ApiResult<HmacSha256> {
        HmacSha256::new_from_slice(self.secret.expose())
            .map_err(|_| ApiError::internal_error("Failed to initialize HMAC"))
    }

    /// Encode `session` as a cookie value issued now.
    pub fn encode(&self, session: &Session) -> ApiResult<String> {
        self.encode_at(session, chrono::Utc::now().timestamp())
    }

    pub fn encode_at(&self, session: &Session, issued_at: i64) -> ApiResult<String> {
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(session)?);
        let signed = format!("{}.{}", payload, issued_at);

        let mut mac = self.mac()?;
        mac.update(signed.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}", signed, signature))
    }

    /// Decode a cookie value; `None` for anything not issued by this codec
    /// or past its max age.
    pub fn decode(&self, value: &str) -> Option<Session> {
        self.decode_at(value, chrono::Utc::now().timestamp())
    }

    pub fn decode_at(&self, value: &str, now: i64) -> Option<Session> {
        let (signed, signature) = value.rsplit_once('.')?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

        let mut mac = self.mac().ok()?;
        mac.update(signed.as_bytes());
        mac.verify_slice(&signature).ok()?;

        let (payload, issued_at) = signed.split_once('.')?;
        let issued_at: i64 = issued_at.parse().ok()?;
        let age = now.saturating_sub(issued_at);
        if age > i64::try_from(self.max_age.as_secs()).unwrap_or(i64::MAX) {
            return None;
        }

        let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
        serde_json::from_slice(&json).ok()
    }

    /// `Set-Cookie` value for `session`. An empty session expires the cookie.
    pub fn set_cookie(&self, session: &Session) -> ApiResult<HeaderValue> {
        let mut cookie = if session.is_empty() {
            format!("{}=null; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", SESSION_COOKIE)
        } else {
            format!(
                "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
                SESSION_COOKIE,
                self.encode(session)?,
                self.max_age.as_secs()
            )
        };
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
            .map_err(|e| ApiError::internal_error(format!("Invalid session cookie: {}", e)))
    }
}

/// Value of cookie `name` across all `Cookie` headers.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
}

// ============================================================================
// REQUEST HANDLE
// ============================================================================

#[derive(Debug)]
struct SessionSlot {
    session: Session,
    dirty: bool,
}

/// Shared, mutable view of the current request's session.
///
/// Installed by [`session_middleware`]; extract it in handlers and
/// middleware that run inside it.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<SessionSlot>>,
}

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionSlot {
                session,
                dirty: false,
            })),
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.lock().await.session.authenticated
    }

    /// Mutate the session; marks it changed only if something differs.
    pub async fn update<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut slot = self.inner.lock().await;
        let before = slot.session.clone();
        let result = f(&mut slot.session);
        if slot.session != before {
            slot.dirty = true;
        }
        result
    }

    /// Session to write back: any non-empty session, or one emptied by
    /// this request.
    async fn to_write(&self) -> Option<Session> {
        let slot = self.inner.lock().await;
        (slot.dirty || !slot.session.is_empty()).then(|| slot.session.clone())
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for SessionHandle
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionHandle>()
            .cloned()
            .ok_or_else(|| ApiError::internal_error("Session middleware is not installed"))
    }
}

// ============================================================================
// MIDDLEWARE
// ============================================================================

/// Load the session from the request cookie and write it back.
pub async fn session_middleware(
    State(codec): State<SessionCodec>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = match read_cookie(request.headers(), SESSION_COOKIE) {
        Some(value) => codec.decode(value).unwrap_or_else(|| {
            tracing::debug!("Discarding invalid or expired session cookie");
            Session::default()
        }),
        None => Session::default(),
    };

    let handle = SessionHandle::new(session);
    request.extensions_mut().insert(handle.clone());

    let mut response = next.run(request).await;

    if let Some(session) = handle.to_write().await {
        match codec.set_cookie(&session) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!(error = %e, "Failed to write session cookie"),
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn codec() -> SessionCodec {
        SessionCodec::new(
            SessionSecret::new("test-secret".to_string()),
            Duration::from_secs(3600),
            false,
        )
    }

    fn signed_in() -> Session {
        Session {
            authenticated: true,
            redirect_to: Some("/-/reports/x.json".to_string()),
            pending_login: None,
        }
    }

    #[test]
    fn test_decode_accepts_own_cookie() {
        let codec = codec();
        let value = codec.encode_at(&signed_in(), 1_000).unwrap();
        assert_eq!(codec.decode_at(&value, 1_500), Some(signed_in()));
    }

    #[test]
    fn test_decode_rejects_other_secret() {
        let value = codec().encode_at(&signed_in(), 1_000).unwrap();
        let other = SessionCodec::new(
            SessionSecret::new("another-secret".to_string()),
            Duration::from_secs(3600),
            false,
        );
        assert_eq!(other.decode_at(&value, 1_000), None);
    }

    #[test]
    fn test_decode_rejects_expired_cookie() {
        let codec = codec();
        let value = codec.encode_at(&signed_in(), 1_000).unwrap();
        assert!(codec.decode_at(&value, 4_600).is_some());
        assert_eq!(codec.decode_at(&value, 4_601), None);
    }

    #[test]
    fn test_decode_rejects_forged_payload() {
        let codec = codec();
        let value = codec.encode_at(&Session::default(), 1_000).unwrap();
        let (_, rest) = value.split_once('.').unwrap();
        let forged_payload = URL_SAFE_NO_PAD.encode(br#"{"authenticated":true}"#);
        let forged = format!("{}.{}", forged_payload, rest);
        assert_eq!(codec.decode_at(&forged, 1_000), None);
    }

    #[test]
    fn test_missing_keys_default_to_anonymous() {
        let session: Session = serde_json::from_str("{}").unwrap();
        assert!(!session.authenticated);
        assert!(session.is_empty());
    }

    #[test]
    fn test_set_cookie_attributes() {
        let value = codec().set_cookie(&signed_in()).unwrap();
        let value = value.to_str().unwrap();
        assert!(value.starts_with("session="));
        assert!(value.contains("Path=/"));
        assert!(value.contains("Max-Age=3600"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("SameSite=Lax"));
        assert!(!value.contains("Secure"));
    }

    #[test]
    fn test_empty_session_expires_cookie() {
        let secure = SessionCodec::new(
            SessionSecret::new("k".to_string()),
            Duration::from_secs(60),
            true,
        );
        let value = secure.set_cookie(&Session::default()).unwrap();
        let value = value.to_str().unwrap();
        assert!(value.contains("Max-Age=0"));
        assert!(value.ends_with("; Secure"));
    }

    #[test]
    fn test_read_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark; session=abc.1.sig"));
        headers.append(header::COOKIE, HeaderValue::from_static("other=1"));
        assert_eq!(read_cookie(&headers, "session"), Some("abc.1.sig"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[tokio::test]
    async fn test_untouched_empty_session_is_not_written() {
        let handle = SessionHandle::new(Session::default());
        handle.update(|s| s.authenticated = false).await;
        assert!(handle.to_write().await.is_none());
    }

    #[tokio::test]
    async fn test_non_empty_session_is_always_rewritten() {
        let handle = SessionHandle::new(signed_in());
        assert_eq!(handle.to_write().await, Some(signed_in()));

        let taken = handle.update(|s| s.redirect_to.take()).await;
        assert_eq!(taken.as_deref(), Some("/-/reports/x.json"));
        assert_eq!(handle.to_write().await.map(|s| s.redirect_to), Some(None));
    }

    #[tokio::test]
    async fn test_emptied_session_is_written_to_expire() {
        let handle = SessionHandle::new(Session {
            authenticated: true,
            ..Session::default()
        });
        handle.update(|s| s.authenticated = false).await;
        assert_eq!(handle.to_write().await, Some(Session::default()));
    }

    proptest! {
        /// Any single-character change to a valid cookie decodes to nothing.
        #[test]
        fn prop_tampered_cookie_rejected(index in 0usize..200, replacement in "[A-Za-z0-9_.-]") {
            let codec = codec();
            let value = codec.encode_at(&signed_in(), 1_000).unwrap();
            let index = index % value.len();
            let mut tampered = value.clone();
            tampered.replace_range(index..index + 1, &replacement);
            prop_assume!(tampered != value);
            prop_assert_eq!(codec.decode_at(&tampered, 1_000), None);
        }

        /// Arbitrary strings never decode and never panic.
        #[test]
        fn prop_garbage_never_authenticates(value in ".*") {
            prop_assert_eq!(codec().decode_at(&value, 1_000), None);
        }
    }
}
