//! OpenID Connect Client
//!
//! The login flow only needs two provider operations: build the
//! authorization redirect, and turn the callback `code` into verified user
//! claims. [`IdentityProvider`] is the seam; [`OpenIdProvider`] implements it
//! against any discovery-document based provider (Google by default).

use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Url;
use secrecy::ExposeSecret;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{OnceCell, RwLock};

use crate::config::OidcSettings;
use crate::error::{ApiError, ApiResult};

// ============================================================================
// USER INFO
// ============================================================================

/// Identity claims extracted from a verified ID token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub email_verified: bool,
    #[serde(default)]
    pub name: Option<String>,
}

/// Some providers send `email_verified` as the string `"true"`.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        String(String),
    }

    Ok(match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => b,
        BoolOrString::String(s) => s.eq_ignore_ascii_case("true"),
    })
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    #[serde(flatten)]
    user: UserInfo,
    #[serde(default)]
    nonce: Option<String>,
}

// ============================================================================
// PROVIDER TRAIT
// ============================================================================

/// Operations the login routes need from an identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL to send the browser to for authentication.
    async fn authorization_url(
        &self,
        redirect_uri: &str,
        state: &str,
        nonce: &str,
    ) -> ApiResult<String>;

    /// Exchange an authorization code for verified user claims.
    ///
    /// Fails with `UpstreamError` when the provider cannot be reached and
    /// `Unauthorized` when the returned token does not verify.
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        nonce: &str,
    ) -> ApiResult<UserInfo>;
}

// ============================================================================
// OPENID PROVIDER
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
struct ProviderMetadata {
    issuer: String,
    authorization_endpoint: String,
    token_endpoint: String,
    jwks_uri: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    id_token: Option<String>,
}

/// Discovery-document based OpenID Connect provider.
pub struct OpenIdProvider {
    settings: OidcSettings,
    http: reqwest::Client,
    metadata: OnceCell<ProviderMetadata>,
    jwks_cache: RwLock<HashMap<String, Jwk>>,
}

impl OpenIdProvider {
    pub fn new(settings: OidcSettings, timeout: Duration) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::internal_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            settings,
            http,
            metadata: OnceCell::new(),
            jwks_cache: RwLock::new(HashMap::new()),
        })
    }

    /// Discovery document, fetched once. A failed fetch is retried next call.
    async fn metadata(&self) -> ApiResult<&ProviderMetadata> {
        self.metadata
            .get_or_try_init(|| async {
                tracing::info!(url = %self.settings.metadata_url, "Fetching OpenID discovery document");
                self.get_json::<ProviderMetadata>(&self.settings.metadata_url)
                    .await
            })
            .await
    }

    async fn get_json<T>(&self, url: &str) -> ApiResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        self.http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| upstream("request", url, e))?
            .json::<T>()
            .await
            .map_err(|e| upstream("decode", url, e))
    }

    async fn get_jwk(&self, metadata: &ProviderMetadata, kid: &str) -> ApiResult<Jwk> {
        {
            let cache = self.jwks_cache.read().await;
            if let Some(jwk) = cache.get(kid) {
                return Ok(jwk.clone());
            }
        }

        // Unknown kid: the provider may have rotated keys.
        tracing::info!(kid, "Refreshing JWKS cache");
        let jwks: JwkSet = self.get_json(&metadata.jwks_uri).await?;
        let mut cache = self.jwks_cache.write().await;
        *cache = jwks
            .keys
            .into_iter()
            .filter_map(|jwk| jwk.common.key_id.clone().map(|kid| (kid, jwk)))
            .collect();

        cache
            .get(kid)
            .cloned()
            .ok_or_else(|| rejected(format!("No signing key with kid '{}'", kid)))
    }

    async fn verify_id_token(
        &self,
        metadata: &ProviderMetadata,
        token: &str,
        nonce: &str,
    ) -> ApiResult<UserInfo> {
        let header = decode_header(token).map_err(|e| rejected(format!("Malformed ID token: {}", e)))?;
        if matches!(header.alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(rejected("Symmetric ID token algorithms are not accepted"));
        }
        let kid = header
            .kid
            .ok_or_else(|| rejected("ID token header has no kid"))?;

        let jwk = self.get_jwk(metadata, &kid).await?;
        let key = DecodingKey::from_jwk(&jwk)
            .map_err(|e| rejected(format!("Unusable signing key: {}", e)))?;

        let validation = id_token_validation(header.alg, metadata, &self.settings.client_id);
        let claims = decode::<IdTokenClaims>(token, &key, &validation)
            .map_err(|e| rejected(format!("ID token rejected: {}", e)))?
            .claims;

        check_nonce(claims, nonce)
    }
}

#[async_trait]
impl IdentityProvider for OpenIdProvider {
    async fn authorization_url(
        &self,
        redirect_uri: &str,
        state: &str,
        nonce: &str,
    ) -> ApiResult<String> {
        let metadata = self.metadata().await?;
        build_authorization_url(metadata, &self.settings, redirect_uri, state, nonce)
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        nonce: &str,
    ) -> ApiResult<UserInfo> {
        let metadata = self.metadata().await?;

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.expose_secret()),
        ];
        let tokens: TokenResponse = self
            .http
            .post(&metadata.token_endpoint)
            .form(&params)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| upstream("token exchange", &metadata.token_endpoint, e))?
            .json()
            .await
            .map_err(|e| upstream("decode", &metadata.token_endpoint, e))?;

        let id_token = tokens
            .id_token
            .ok_or_else(|| ApiError::upstream_error("Token response did not include an id_token"))?;

        self.verify_id_token(metadata, &id_token, nonce).await
    }
}

fn build_authorization_url(
    metadata: &ProviderMetadata,
    settings: &OidcSettings,
    redirect_uri: &str,
    state: &str,
    nonce: &str,
) -> ApiResult<String> {
    let url = Url::parse_with_params(
        &metadata.authorization_endpoint,
        &[
            ("response_type", "code"),
            ("client_id", settings.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("scope", settings.scopes.as_str()),
            ("state", state),
            ("nonce", nonce),
        ],
    )
    .map_err(|e| ApiError::upstream_error(format!("Invalid authorization endpoint: {}", e)))?;

    Ok(url.into())
}

fn id_token_validation(alg: Algorithm, metadata: &ProviderMetadata, client_id: &str) -> Validation {
    let mut validation = Validation::new(alg);
    // Google issues tokens with and without the scheme.
    let bare_issuer = metadata.issuer.trim_start_matches("https://");
    validation.set_issuer(&[metadata.issuer.as_str(), bare_issuer]);
    validation.set_audience(&[client_id]);
    validation
}

fn check_nonce(claims: IdTokenClaims, expected: &str) -> ApiResult<UserInfo> {
    if claims.nonce.as_deref() != Some(expected) {
        return Err(rejected("ID token nonce mismatch"));
    }
    Ok(claims.user)
}

fn upstream(operation: &str, url: &str, err: reqwest::Error) -> ApiError {
    tracing::warn!(operation, url, error = %err, "Identity provider call failed");
    ApiError::upstream_error(format!("Identity provider {} failed: {}", operation, err))
}

fn rejected(reason: impl Into<String>) -> ApiError {
    let reason = reason.into();
    tracing::warn!(reason = %reason, "Identity token rejected");
    ApiError::unauthorized("Could not validate credentials")
}
