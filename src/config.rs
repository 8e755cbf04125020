//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::{net::IpAddr, path::PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub client: ClientConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub github: GitHubConfig,
    pub http: HttpClientConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 4000)
    pub port: u16,
    /// Public domain (e.g., "vault.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL for the API server
    ///
    /// # Returns
    /// Full URL like "https://vault.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Browser client (frontend) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Frontend origin allowed by CORS and used for post-login redirects
    /// (e.g., "http://localhost:5173")
    pub origin: String,
}

impl ClientConfig {
    /// URL the browser lands on after a successful GitHub sign-in
    pub fn dashboard_url(&self) -> String {
        format!("{}/dashboard", self.origin.trim_end_matches('/'))
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
    /// Maximum pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection before failing
    #[serde(default = "default_acquire_timeout_seconds")]
    pub acquire_timeout_seconds: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout_seconds() -> u64 {
    5
}

/// Session and credential configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session secret key (32+ bytes)
    pub session_secret: String,
    /// Session max age in seconds (default: 604800 = 7 days)
    pub session_max_age: i64,
    /// Base64-encoded 32-byte key for encrypting stored GitHub tokens.
    ///
    /// Derived from `session_secret` when omitted.
    pub token_encryption_key: Option<String>,
}

/// GitHub OAuth application and API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Registered OAuth callback URL
    /// (e.g., "http://localhost:4000/auth/github/callback")
    pub callback_url: String,
    /// Base URL of the OAuth endpoints (default: "https://github.com")
    pub oauth_base_url: String,
    /// Base URL of the REST API (default: "https://api.github.com")
    pub api_base_url: String,
}

/// Outbound HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpClientConfig {
    /// Request timeout in seconds (default: 10)
    pub timeout_seconds: u64,
    /// User-Agent header sent to upstream APIs
    pub user_agent: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl LoggingConfig {
    /// Filter directives used when `RUST_LOG` is unset
    pub fn default_filter(&self) -> String {
        format!("codevault={},tower_http=debug", self.level)
    }

    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (CODEVAULT__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 4000)?
            .set_default("server.domain", "localhost:4000")?
            .set_default("server.protocol", "http")?
            .set_default("client.origin", "http://localhost:5173")?
            .set_default("database.path", "data/codevault.db")?
            .set_default("database.max_connections", 5)?
            .set_default("database.acquire_timeout_seconds", 5)?
            .set_default("auth.session_max_age", 604800)?
            .set_default(
                "github.callback_url",
                "http://localhost:4000/auth/github/callback",
            )?
            .set_default("github.oauth_base_url", "https://github.com")?
            .set_default("github.api_base_url", "https://api.github.com")?
            .set_default("http.timeout_seconds", 10)?
            .set_default("http.user_agent", "CodeVault/0.1.0")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (CODEVAULT__*)
            .add_source(
                Environment::with_prefix("CODEVAULT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
            || !is_local_server_domain(&self.server.domain)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.auth.session_secret.as_bytes().len() < MIN_SESSION_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        if self.auth.session_max_age > crate::auth::session::MAX_SESSION_AGE_SECONDS {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_max_age must be at most {} seconds",
                crate::auth::session::MAX_SESSION_AGE_SECONDS
            )));
        }

        if self.http.timeout_seconds == 0 {
            return Err(crate::error::AppError::Config(
                "http.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self
            .logging
            .level
            .parse::<tracing::level_filters::LevelFilter>()
            .is_err()
        {
            return Err(crate::error::AppError::Config(format!(
                "logging.level is not a log level: {}",
                self.logging.level
            )));
        }

        if let Some(key) = self.auth.token_encryption_key.as_deref() {
            crate::auth::TokenCipher::decode_key(key)?;
        }

        if url::Url::parse(&self.client.origin).is_err() {
            return Err(crate::error::AppError::Config(format!(
                "client.origin must be an absolute URL: {}",
                self.client.origin
            )));
        }

        if !self.should_use_secure_cookies() {
            let host = normalized_server_host(&self.server.domain);
            tracing::warn!(
                host = %host,
                protocol = %self.server.protocol,
                "Using insecure session cookies for local development"
            );
        } else if !self.server.protocol.eq_ignore_ascii_case("https") {
            return Err(crate::error::AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        Ok(())
    }
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}
