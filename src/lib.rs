//! CodeVault - a code snippet vault backend
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Password signup/login, session cookie                    │
//! │  - GitHub OAuth redirect/callback                           │
//! │  - Projects, files, GitHub repos proxy                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Account linking                                          │
//! │  - Ownership checks                                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx)                                            │
//! │  - GitHub REST API (reqwest)                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers under `/api`
//! - `service`: Business logic layer
//! - `data`: Database layer
//! - `auth`: Sessions, passwords, GitHub OAuth
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Built once at startup and read-only afterwards; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Session token signer
    pub sessions: Arc<auth::SessionCodec>,

    /// Cipher for GitHub tokens at rest
    pub tokens: Arc<auth::TokenCipher>,

    /// OAuth provider used by `/auth/github`
    pub oauth: Arc<dyn auth::OAuthProvider>,

    /// HTTP client for the GitHub API
    pub http_client: Arc<reqwest::Client>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Build the outbound HTTP client
    /// 2. Connect to SQLite database (runs migrations)
    /// 3. Build the session codec and token cipher
    /// 4. Wire up the GitHub OAuth provider
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Initialize HTTP client
        let http_client = reqwest::Client::builder()
            .user_agent(config.http.user_agent.as_str())
            .timeout(std::time::Duration::from_secs(config.http.timeout_seconds))
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;

        // 2. Connect to SQLite database
        let db = data::Database::connect_with_options(
            &config.database.path,
            data::PoolOptions::from(&config.database),
        )
        .await?;
        tracing::info!(path = %config.database.path.display(), "Database connected");

        // 3. Credentials
        let sessions = auth::SessionCodec::from_config(&config.auth);
        let tokens = auth::TokenCipher::from_config(&config.auth)?;

        // 4. OAuth provider
        let oauth = auth::GitHubProvider::new(&config.github, http_client.clone());

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            sessions: Arc::new(sessions),
            tokens: Arc::new(tokens),
            oauth: Arc::new(oauth),
            http_client: Arc::new(http_client),
        })
    }

    /// Replace the OAuth provider
    pub fn with_oauth_provider(mut self, provider: Arc<dyn auth::OAuthProvider>) -> Self {
        self.oauth = provider;
        self
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    let cors_layer = build_cors_layer(&state.config.client);

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(auth::auth_router())
        .nest("/api", api::api_router(state.clone()))
        .merge(api::metrics_router(state.clone()))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

fn build_cors_layer(client: &config::ClientConfig) -> tower_http::cors::CorsLayer {
    use axum::http::{HeaderValue, Method, header};
    use tower_http::cors::CorsLayer;

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let allowed_origin = client.origin.trim_end_matches('/');
    match HeaderValue::from_str(allowed_origin) {
        Ok(origin) => layer.allow_origin([origin]).allow_credentials(true),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from client origin; denying cross-origin requests"
            );
            layer
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}
