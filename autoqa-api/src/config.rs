//! Application Configuration Module
//!
//! Loads process configuration from environment variables. Everything goes
//! through [`AppConfig::from_lookup`] so tests can supply a map instead of
//! mutating the process environment.

use secrecy::SecretString;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ApiError, ApiResult};
use crate::session::SessionSecret;

/// Default and sole allowed bucket for artifact links.
pub const DEFAULT_REPORTS_BUCKET: &str = "qa.etl.farm";
pub const DEFAULT_RESULTS_TABLE: &str = "etl-autoqa-results";
pub const DEFAULT_HULLSCRUBBER_TABLE: &str = "etl-hullscrubber-qa-results";
pub const DEFAULT_OIDC_METADATA_URL: &str =
    "https://accounts.google.com/.well-known/openid-configuration";
/// Scopes requested from the identity provider.
pub const OIDC_SCOPES: &str = "openid email profile";

const DEFAULT_SESSION_MAX_AGE_SECS: u64 = 14 * 24 * 60 * 60;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PORT: u16 = 5000;

// ============================================================================
// OPENID CLIENT SETTINGS
// ============================================================================

/// Statically registered OpenID client.
#[derive(Clone)]
pub struct OidcSettings {
    pub client_id: String,
    pub client_secret: SecretString,
    /// Discovery document URL.
    pub metadata_url: String,
    pub scopes: String,
}

impl std::fmt::Debug for OidcSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidcSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("metadata_url", &self.metadata_url)
            .field("scopes", &self.scopes)
            .finish()
    }
}

// ============================================================================
// APP CONFIGURATION
// ============================================================================

/// Process-wide configuration for the dashboard.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Attach underlying error text to error responses.
    pub debug: bool,

    /// Session cookie signing key.
    pub secret_key: SessionSecret,

    /// Bucket used when a locator names none; the only bucket links are minted for.
    pub reports_bucket: String,

    /// Platform results table.
    pub results_table: String,

    /// Hullscrubber results table.
    pub hullscrubber_table: String,

    pub oidc: OidcSettings,

    /// Absolute origin (e.g. `https://qa.example.com`) for the callback URL.
    /// When `None` the origin comes from the request's forwarded headers.
    pub public_base_url: Option<String>,

    /// Normalized base path: empty, or `/name` with no trailing slash.
    pub stage: String,

    pub static_dir: PathBuf,

    pub session_max_age: Duration,
    pub session_https_only: bool,

    /// Per-call deadline for table scans, presigning and identity calls.
    pub upstream_timeout: Duration,

    pub bind_addr: SocketAddr,
}

impl AppConfig {
    /// Create AppConfig from environment variables.
    ///
    /// Environment variables:
    /// - `DEBUG`: verbose error details (default: false)
    /// - `SECRET_KEY`: session signing key (required)
    /// - `REPORTS_BUCKET`: allowed bucket (default: qa.etl.farm)
    /// - `RESULTS_TABLE_NAME`: platform table (default: etl-autoqa-results)
    /// - `HULLSCRUBBER_RESULTS_TABLE_NAME`: hullscrubber table (default: etl-hullscrubber-qa-results)
    /// - `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`: OpenID client (required)
    /// - `OIDC_METADATA_URL`: discovery document (default: Google)
    /// - `PUBLIC_BASE_URL`: origin for the callback URL (optional)
    /// - `STAGE`: base path prefix (optional)
    /// - `STATIC_DIR`: static asset directory (default: static)
    /// - `SESSION_MAX_AGE_SECS`: cookie lifetime (default: 1209600)
    /// - `SESSION_HTTPS_ONLY`: mark the cookie Secure (default: false)
    /// - `UPSTREAM_TIMEOUT_SECS`: upstream call deadline (default: 10)
    /// - `BIND`, `PORT`: listen address (default: 0.0.0.0:5000)
    pub fn from_env() -> ApiResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> ApiResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset.
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &str| {
            get(name).ok_or_else(|| {
                ApiError::configuration(format!("Environment variable {} is required", name))
            })
        };
        let flag = |name: &str, default: bool| match get(name) {
            Some(raw) => parse_bool(name, &raw),
            None => Ok(default),
        };
        let number = |name: &str, default: u64| match get(name) {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                ApiError::configuration(format!("{} must be a non-negative integer, got '{}'", name, raw))
            }),
            None => Ok(default),
        };

        let secret_key = SessionSecret::new(required("SECRET_KEY")?);

        // tokio's timeout elapses immediately on a zero duration.
        let upstream_secs = number("UPSTREAM_TIMEOUT_SECS", DEFAULT_UPSTREAM_TIMEOUT_SECS)?;
        let upstream_timeout = match upstream_secs {
            0 => {
                return Err(ApiError::configuration(
                    "UPSTREAM_TIMEOUT_SECS must be at least 1",
                ))
            }
            secs => Duration::from_secs(secs),
        };

        let oidc = OidcSettings {
            client_id: required("GOOGLE_CLIENT_ID")?,
            client_secret: SecretString::new(required("GOOGLE_CLIENT_SECRET")?.into()),
            metadata_url: get("OIDC_METADATA_URL")
                .unwrap_or_else(|| DEFAULT_OIDC_METADATA_URL.to_string()),
            scopes: OIDC_SCOPES.to_string(),
        };

        let bind_ip: IpAddr = match get("BIND") {
            Some(raw) => raw.parse().map_err(|_| {
                ApiError::configuration(format!("BIND must be an IP address, got '{}'", raw))
            })?,
            None => IpAddr::from([0, 0, 0, 0]),
        };
        let port = match get("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| {
                ApiError::configuration(format!("PORT must be a port number, got '{}'", raw))
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            debug: flag("DEBUG", false)?,
            secret_key,
            reports_bucket: get("REPORTS_BUCKET")
                .unwrap_or_else(|| DEFAULT_REPORTS_BUCKET.to_string()),
            results_table: get("RESULTS_TABLE_NAME")
                .unwrap_or_else(|| DEFAULT_RESULTS_TABLE.to_string()),
            hullscrubber_table: get("HULLSCRUBBER_RESULTS_TABLE_NAME")
                .unwrap_or_else(|| DEFAULT_HULLSCRUBBER_TABLE.to_string()),
            oidc,
            public_base_url: get("PUBLIC_BASE_URL").map(|u| u.trim_end_matches('/').to_string()),
            stage: normalize_stage(get("STAGE").as_deref()),
            static_dir: PathBuf::from(get("STATIC_DIR").unwrap_or_else(|| "static".to_string())),
            session_max_age: Duration::from_secs(number(
                "SESSION_MAX_AGE_SECS",
                DEFAULT_SESSION_MAX_AGE_SECS,
            )?),
            session_https_only: flag("SESSION_HTTPS_ONLY", false)?,
            upstream_timeout,
            bind_addr: SocketAddr::new(bind_ip, port),
        })
    }

    /// Path of the report listing, e.g. `/` or `/prod/`.
    pub fn index_path(&self) -> String {
        format!("{}/", self.stage)
    }

    pub fn login_path(&self) -> String {
        format!("{}/login", self.stage)
    }

    pub fn callback_path(&self) -> String {
        format!("{}/login/callback", self.stage)
    }
}

fn parse_bool(name: &str, raw: &str) -> ApiResult<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ApiError::configuration(format!(
            "{} must be a boolean, got '{}'",
            name, raw
        ))),
    }
}

/// `prod`, `/prod` and `/prod/` all become `/prod`; nothing becomes empty.
fn normalize_stage(raw: Option<&str>) -> String {
    match raw.map(|s| s.trim_matches('/')) {
        Some(stage) if !stage.is_empty() => format!("/{}", stage),
        _ => String::new(),
    }
}
