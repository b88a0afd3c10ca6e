//! Cart and order-backend configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `ORDER_BACKEND` - `http` (default) or `local`
//! - `MARKET_API_BASE_URL` - Marketplace API base URL
//!   (default: `http://localhost:8080/FarmersMarketplace`)
//! - `MARKET_API_TOKEN` - Bearer token sent with API requests
//! - `MARKET_API_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `MARKET_ORDER_STORE_PATH` - JSON file backing the local order store;
//!   unset keeps local orders in memory only

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use crate::backend::{BackendError, HttpOrderBackend, LocalOrderStore, OrderBackend};

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/FarmersMarketplace";
const DEFAULT_TIMEOUT_SECS: &str = "10";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "xxx",
    "todo",
    "insert",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Which order backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// The marketplace REST API.
    #[default]
    Http,
    /// The local order log.
    Local,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" | "api" => Ok(Self::Http),
            "local" | "mock" => Ok(Self::Local),
            other => Err(format!("expected `http` or `local`, got `{other}`")),
        }
    }
}

/// Marketplace API connection settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL; order endpoints live under `{base}/api/orders`
    pub base_url: Url,
    /// Optional bearer token
    pub token: Option<SecretString>,
    /// Per-request timeout
    pub timeout: Duration,
}

/// Top-level configuration.
#[derive(Debug, Clone)]
pub struct MarketConfig {
    /// Selected order backend
    pub backend: BackendKind,
    /// API settings (used by the `http` backend)
    pub api: ApiConfig,
    /// File for the `local` backend
    pub order_store_path: Option<PathBuf>,
}

impl MarketConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let backend = env
            .or_default("ORDER_BACKEND", "http")
            .parse::<BackendKind>()
            .map_err(|e| ConfigError::InvalidEnvVar("ORDER_BACKEND".to_string(), e))?;

        let base_url =
            parse_base_url(&env.or_default("MARKET_API_BASE_URL", DEFAULT_API_BASE_URL))?;

        let token = env
            .optional("MARKET_API_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .map(|token| validate_token(SecretString::from(token), "MARKET_API_TOKEN"))
            .transpose()?;

        let timeout_secs = env
            .or_default("MARKET_API_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("MARKET_API_TIMEOUT_SECS".to_string(), e.to_string())
            })?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "MARKET_API_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let order_store_path = env
            .optional("MARKET_ORDER_STORE_PATH")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        let config = Self {
            backend,
            api: ApiConfig {
                base_url,
                token,
                timeout: Duration::from_secs(timeout_secs),
            },
            order_store_path,
        };

        tracing::debug!(
            backend = ?config.backend,
            base_url = %config.api.base_url,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Build the configured order backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the local
    /// order file cannot be read.
    pub async fn build_backend(&self) -> Result<Arc<dyn OrderBackend>, BackendError> {
        let backend: Arc<dyn OrderBackend> = match self.backend {
            BackendKind::Http => Arc::new(HttpOrderBackend::new(&self.api)?),
            BackendKind::Local => match &self.order_store_path {
                Some(path) => Arc::new(LocalOrderStore::open(path).await?),
                None => Arc::new(LocalOrderStore::in_memory()),
            },
        };
        tracing::info!(backend = backend.name(), "Order backend ready");
        Ok(backend)
    }
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid =
        |msg: String| ConfigError::InvalidEnvVar("MARKET_API_BASE_URL".to_string(), msg);

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme `{}`", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("URL must have a host".to_string()));
    }
    Ok(url)
}

fn validate_token(token: SecretString, var_name: &str) -> Result<SecretString, ConfigError> {
    let lower = token.expose_secret().to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("looks like a placeholder (contains '{pattern}')"),
        ));
    }
    Ok(token)
}
