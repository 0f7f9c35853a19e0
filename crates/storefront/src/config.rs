//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `BAZAAR_API_BASE_URL` - Commerce backend origin (default: <https://ecommerce.routemisr.com>)
//! - `BAZAAR_AUTH_SCHEME` - How the session token is sent: `bearer` or `token` (default: bearer)
//! - `BAZAAR_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: none, client default applies)
//! - `BAZAAR_CATALOG_CACHE_TTL_SECS` - Catalog cache TTL (default: 300)
//! - `BAZAAR_SEARCH_DEBOUNCE_MS` - Search debounce window (default: 400)
//! - `BAZAAR_STORAGE_PATH` - File backing the key-value store (default: .bazaar/storage.json)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "https://ecommerce.routemisr.com";
const DEFAULT_CATALOG_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 400;
const DEFAULT_STORAGE_PATH: &str = ".bazaar/storage.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// How the session token is attached to backend requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthScheme {
    /// `Authorization: Bearer <token>`
    #[default]
    Bearer,
    /// `token: <token>`
    TokenHeader,
}

impl std::str::FromStr for AuthScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bearer" => Ok(Self::Bearer),
            "token" => Ok(Self::TokenHeader),
            other => Err(format!("expected 'bearer' or 'token', got '{other}'")),
        }
    }
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Commerce backend API configuration
    pub api: ApiConfig,
    /// How long catalog reads stay cached
    pub catalog_cache_ttl: Duration,
    /// Quiet period before a search query is sent
    pub search_debounce: Duration,
    /// File backing the persistent key-value store
    pub storage_path: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Commerce backend API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Backend origin; endpoints live under `/api/v1/`
    pub base_url: Url,
    /// How the session token is sent
    pub auth_scheme: AuthScheme,
    /// Per-request timeout, if any
    pub request_timeout: Option<Duration>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = parse_base_url(
            "BAZAAR_API_BASE_URL",
            &get_env_or_default("BAZAAR_API_BASE_URL", DEFAULT_API_BASE_URL),
        )?;
        let auth_scheme = get_env_or_default("BAZAAR_AUTH_SCHEME", "bearer")
            .parse::<AuthScheme>()
            .map_err(|e| ConfigError::InvalidEnvVar("BAZAAR_AUTH_SCHEME".to_string(), e))?;
        let request_timeout =
            get_optional_u64("BAZAAR_REQUEST_TIMEOUT_SECS")?.map(Duration::from_secs);
        let catalog_cache_ttl = Duration::from_secs(
            get_optional_u64("BAZAAR_CATALOG_CACHE_TTL_SECS")?
                .unwrap_or(DEFAULT_CATALOG_CACHE_TTL_SECS),
        );
        let search_debounce = Duration::from_millis(
            get_optional_u64("BAZAAR_SEARCH_DEBOUNCE_MS")?.unwrap_or(DEFAULT_SEARCH_DEBOUNCE_MS),
        );
        let storage_path =
            PathBuf::from(get_env_or_default("BAZAAR_STORAGE_PATH", DEFAULT_STORAGE_PATH));
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            api: ApiConfig {
                base_url,
                auth_scheme,
                request_timeout,
            },
            catalog_cache_ttl,
            search_debounce,
            storage_path,
            sentry_dsn,
        })
    }

    /// Configuration pointing at a specific backend with default settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL cannot be parsed.
    pub fn for_base_url(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api: ApiConfig {
                base_url: parse_base_url("base_url", base_url)?,
                auth_scheme: AuthScheme::default(),
                request_timeout: None,
            },
            catalog_cache_ttl: Duration::from_secs(DEFAULT_CATALOG_CACHE_TTL_SECS),
            search_debounce: Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS),
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            sentry_dsn: None,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Get an optional environment variable parsed as `u64`.
fn get_optional_u64(key: &str) -> Result<Option<u64>, ConfigError> {
    get_optional_env(key)
        .map(|v| {
            v.trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
        .transpose()
}

/// Parse a backend origin, requiring http(s).
fn parse_base_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}
