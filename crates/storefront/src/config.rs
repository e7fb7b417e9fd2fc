//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `STOREFRONT_DOCUMENT_URL` - Document service URL (only when the backend is `remote`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_CATALOG_BACKEND` - `local`, `memory` or `remote` (default: local)
//! - `STOREFRONT_DATA_DIR` - Directory for local data files (default: ./data)
//! - `STOREFRONT_DOCUMENT_TOKEN` - Bearer token for the document service
//! - `STOREFRONT_DOCUMENT_POLL_SECS` - Change poll interval in seconds (default: 5)
//! - `STOREFRONT_ADMIN_USERNAME` - Admin login name (default: admin)
//! - `STOREFRONT_ADMIN_PASSWORD` - Admin password (default: password)
//! - `STOREFRONT_SEED_COUNT` - Products requested when seeding (default: 12)
//! - `GEMINI_API_KEY` - Generative Language API key (seeding falls back without it)
//! - `GEMINI_MODEL` - Model ID (default: gemini-2.5-flash)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_SEED_COUNT: usize = 12;
/// Largest number of products a seed run may request.
pub const MAX_SEED_COUNT: usize = 50;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Where the catalog is persisted
    pub catalog: CatalogConfig,
    /// Admin login
    pub admin: AdminCredentials,
    /// Seed generator; `None` means seeding always uses the fallback catalog
    pub gemini: Option<GeminiConfig>,
    /// Number of products requested when seeding
    pub seed_count: usize,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Which catalog backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogBackendKind {
    /// JSON files in the data directory.
    #[default]
    Local,
    /// In-process document collection; nothing survives a restart.
    Memory,
    /// Remote document service.
    Remote,
}

impl FromStr for CatalogBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "memory" => Ok(Self::Memory),
            "remote" => Ok(Self::Remote),
            other => Err(format!("expected local, memory or remote, got '{other}'")),
        }
    }
}

/// Catalog persistence configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Selected backend
    pub backend: CatalogBackendKind,
    /// Directory for local data (catalog file, seed marker)
    pub data_dir: PathBuf,
    /// Remote document service, required for `Remote`
    pub document: Option<DocumentStoreConfig>,
}

/// Remote document service configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct DocumentStoreConfig {
    /// Base URL of the service
    pub url: Url,
    /// Optional bearer token
    pub token: Option<SecretString>,
    /// How often subscriptions poll for changes
    pub poll_interval: Duration,
}

impl std::fmt::Debug for DocumentStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStoreConfig")
            .field("url", &self.url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

/// The single admin credential pair checked at login.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct AdminCredentials {
    /// Login name
    pub username: String,
    /// Password
    pub password: SecretString,
}

impl Default for AdminCredentials {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: SecretString::from("password"),
        }
    }
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Generative Language API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct GeminiConfig {
    /// API key
    pub api_key: SecretString,
    /// Model ID (e.g., gemini-2.5-flash)
    pub model: String,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or_default("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env_or_default("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        let catalog = CatalogConfig::from_env()?;
        let admin = AdminCredentials::from_env();
        let gemini = GeminiConfig::from_env();

        let seed_count: usize =
            parse_env_or_default("STOREFRONT_SEED_COUNT", &DEFAULT_SEED_COUNT.to_string())?;
        if seed_count == 0 || seed_count > MAX_SEED_COUNT {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_SEED_COUNT".to_string(),
                format!("must be between 1 and {MAX_SEED_COUNT}"),
            ));
        }

        Ok(Self {
            host,
            port,
            base_url,
            catalog,
            admin,
            gemini,
            seed_count,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Configuration with every optional setting at its default.
    ///
    /// Used by tooling and tests that build the app without an environment.
    #[must_use]
    pub fn with_catalog(base_url: impl Into<String>, catalog: CatalogConfig) -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: base_url.into(),
            catalog,
            admin: AdminCredentials::default(),
            gemini: None,
            seed_count: DEFAULT_SEED_COUNT,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl CatalogConfig {
    /// An in-process catalog that keeps nothing on disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            backend: CatalogBackendKind::Memory,
            data_dir: PathBuf::from("./data"),
            document: None,
        }
    }

    /// Load catalog configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the backend name is unknown or the remote
    /// backend is selected without a document service URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend: CatalogBackendKind =
            parse_env_or_default("STOREFRONT_CATALOG_BACKEND", "local")?;
        let data_dir = PathBuf::from(get_env_or_default("STOREFRONT_DATA_DIR", "./data"));

        let document = match get_optional_env("STOREFRONT_DOCUMENT_URL") {
            Some(raw) => Some(DocumentStoreConfig::from_env(&raw)?),
            None if backend == CatalogBackendKind::Remote => {
                return Err(ConfigError::MissingEnvVar(
                    "STOREFRONT_DOCUMENT_URL".to_string(),
                ));
            }
            None => None,
        };

        Ok(Self {
            backend,
            data_dir,
            document,
        })
    }
}

impl DocumentStoreConfig {
    fn from_env(raw_url: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(raw_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_DOCUMENT_URL".to_string(), e.to_string())
        })?;
        let poll_secs: u64 = parse_env_or_default("STOREFRONT_DOCUMENT_POLL_SECS", "5")?;
        if poll_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_DOCUMENT_POLL_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let token = get_optional_env("STOREFRONT_DOCUMENT_TOKEN").map(|token| {
            if let Err(reason) = validate_secret_strength(&token) {
                tracing::warn!("STOREFRONT_DOCUMENT_TOKEN validation warning: {reason}");
            }
            SecretString::from(token)
        });

        Ok(Self {
            url,
            token,
            poll_interval: Duration::from_secs(poll_secs),
        })
    }
}

impl AdminCredentials {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            username: get_optional_env("STOREFRONT_ADMIN_USERNAME").unwrap_or(defaults.username),
            password: get_optional_env("STOREFRONT_ADMIN_PASSWORD")
                .map_or(defaults.password, SecretString::from),
        }
    }
}

impl GeminiConfig {
    /// Load Gemini configuration from environment.
    ///
    /// Returns `None` if `GEMINI_API_KEY` is not set (seeding uses the
    /// fallback catalog).
    pub fn from_env() -> Option<Self> {
        get_optional_env("GEMINI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .map(|key| {
                if let Err(reason) = validate_secret_strength(&key) {
                    tracing::warn!("GEMINI_API_KEY validation warning: {reason}");
                }
                Self {
                    api_key: SecretString::from(key),
                    model: get_env_or_default("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
                }
            })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Check that an API key or token is not a placeholder and looks random.
fn validate_secret_strength(secret: &str) -> Result<(), String> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(format!("appears to be a placeholder (contains '{pattern}')"));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(format!(
            "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
        ));
    }

    Ok(())
}
