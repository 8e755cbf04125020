//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use codevault::auth::{ExternalProfile, OAuthProvider};
use codevault::error::AppError;
use codevault::{AppState, config};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

const DEFAULT_TIMEOUT_SECONDS: u64 = 5;

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

/// OAuth provider that accepts one code and returns a fixed profile
pub struct FakeGitHub {
    pub code: String,
    pub profile: ExternalProfile,
}

#[async_trait]
impl OAuthProvider for FakeGitHub {
    fn authorize_url(&self, state: &str) -> String {
        format!("https://github.test/login/oauth/authorize?state={state}")
    }

    async fn exchange_code_for_profile(&self, code: &str) -> Result<ExternalProfile, AppError> {
        if code == self.code {
            Ok(self.profile.clone())
        } else {
            Err(AppError::OAuth("bad_verification_code".to_string()))
        }
    }
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::start("https://api.github.com", DEFAULT_TIMEOUT_SECONDS, None).await
    }

    /// Test server whose GitHub API calls go to `api_base_url`
    pub async fn with_github_api(api_base_url: &str) -> Self {
        Self::start(api_base_url, DEFAULT_TIMEOUT_SECONDS, None).await
    }

    /// Like `with_github_api`, with a custom outbound request timeout
    pub async fn with_github_api_timeout(api_base_url: &str, timeout_seconds: u64) -> Self {
        Self::start(api_base_url, timeout_seconds, None).await
    }

    /// Test server with an injected OAuth provider
    pub async fn with_oauth_provider(provider: Arc<dyn OAuthProvider>) -> Self {
        Self::start("https://api.github.com", DEFAULT_TIMEOUT_SECONDS, Some(provider)).await
    }

    async fn start(
        api_base_url: &str,
        timeout_seconds: u64,
        provider: Option<Arc<dyn OAuthProvider>>,
    ) -> Self {
        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
            },
            client: config::ClientConfig {
                origin: "http://localhost:5173".to_string(),
            },
            database: config::DatabaseConfig {
                path: db_path,
                max_connections: 5,
                acquire_timeout_seconds: 5,
            },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                session_max_age: 604800,
                token_encryption_key: None,
            },
            github: config::GitHubConfig {
                client_id: "test-client-id".to_string(),
                client_secret: "test-client-secret".to_string(),
                callback_url: "http://localhost:4000/auth/github/callback".to_string(),
                oauth_base_url: "https://github.com".to_string(),
                api_base_url: api_base_url.to_string(),
            },
            http: config::HttpClientConfig {
                timeout_seconds,
                user_agent: "CodeVault/test".to_string(),
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let mut state = AppState::new(config).await.unwrap();
        if let Some(provider) = provider {
            state = state.with_oauth_provider(provider);
        }

        // Create HTTP client; redirects are asserted, not followed
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = codevault::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Sign up a user and return the `token=...` cookie pair
    pub async fn signup(&self, username: &str, password: &str) -> String {
        let response = self
            .client
            .post(self.url("/api/auth/signup"))
            .json(&json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": password,
                "name": username,
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200, "signup for {username} failed");
        session_cookie(&response).expect("signup sets the session cookie")
    }

    /// GET with a cookie header
    pub async fn get_with_cookie(&self, path: &str, cookie: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("Cookie", cookie)
            .send()
            .await
            .unwrap()
    }

    /// POST JSON with a cookie header
    pub async fn post_with_cookie(&self, path: &str, cookie: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("Cookie", cookie)
            .json(&body)
            .send()
            .await
            .unwrap()
    }
}

/// All Set-Cookie header values of a response
pub fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(ToOwned::to_owned)
        .collect()
}

/// The `token=<value>` pair from a response, if it set a non-empty one
pub fn session_cookie(response: &reqwest::Response) -> Option<String> {
    set_cookies(response).into_iter().find_map(|cookie| {
        let pair = cookie.split(';').next()?.trim().to_string();
        let value = pair.strip_prefix("token=")?;
        (!value.is_empty()).then_some(pair)
    })
}

/// Spawn a stand-in for the GitHub REST API and return its base URL
///
/// `GET /user/repos` answers with `repos` when the bearer token equals
/// `expected_token`, and 401 otherwise.
pub async fn spawn_github_api(expected_token: &'static str, repos: Value) -> String {
    use axum::{Json, Router, http::HeaderMap, http::StatusCode, routing::get};

    let app = Router::new().route(
        "/user/repos",
        get(move |headers: HeaderMap| {
            let repos = repos.clone();
            async move {
                let authorized = headers
                    .get("authorization")
                    .and_then(|value| value.to_str().ok())
                    == Some(format!("Bearer {expected_token}").as_str());
                if authorized {
                    (StatusCode::OK, Json(repos))
                } else {
                    (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({ "message": "Bad credentials" })),
                    )
                }
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

/// Spawn a GitHub API stand-in that waits `delay` before answering
/// `GET /user/repos` with an empty list
pub async fn spawn_slow_github_api(delay: Duration) -> String {
    use axum::{Json, Router, routing::get};

    let app = Router::new().route(
        "/user/repos",
        get(move || async move {
            tokio::time::sleep(delay).await;
            Json(json!([]))
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}
