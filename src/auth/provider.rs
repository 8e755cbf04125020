//! OAuth providers
//!
//! A provider turns an authorization code into an external profile.
//! GitHub is the only provider wired up today.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Instant;

use crate::config::GitHubConfig;
use crate::error::AppError;

/// Profile returned by a provider after a successful code exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalProfile {
    /// Provider-side account ID
    pub id: i64,
    /// Provider login (e.g. GitHub username)
    pub login: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    /// Primary verified email, if the provider disclosed one
    pub email: Option<String>,
    /// Access token for calling the provider's API on the user's behalf
    pub access_token: String,
}

impl ExternalProfile {
    /// Email to store for this profile
    ///
    /// Falls back to `<login>@github.local` when none was disclosed.
    pub fn email_or_placeholder(&self) -> String {
        self.email
            .clone()
            .unwrap_or_else(|| format!("{}@github.local", self.login))
    }
}

/// Authorization-code OAuth provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// URL to send the browser to, carrying the CSRF `state`
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange an authorization code for the user's profile
    async fn exchange_code_for_profile(&self, code: &str) -> Result<ExternalProfile, AppError>;
}

/// GitHub token response
#[derive(Debug, Deserialize)]
struct GitHubTokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// GitHub user info
#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
    id: i64,
    avatar_url: Option<String>,
    name: Option<String>,
    email: Option<String>,
}

/// Entry from GET /user/emails
#[derive(Debug, Deserialize)]
struct GitHubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

/// Scopes requested from GitHub
pub const GITHUB_SCOPES: &str = "read:user user:email repo";

/// GitHub OAuth app
pub struct GitHubProvider {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    callback_url: String,
    oauth_base_url: String,
    api_base_url: String,
}

impl GitHubProvider {
    pub fn new(config: &GitHubConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            callback_url: config.callback_url.clone(),
            oauth_base_url: config.oauth_base_url.trim_end_matches('/').to_string(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn exchange_code(&self, code: &str) -> Result<String, AppError> {
        let started = Instant::now();
        let response = self
            .client
            .post(format!("{}/login/oauth/access_token", self.oauth_base_url))
            .header(http::header::ACCEPT, "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.callback_url.as_str()),
            ])
            .send()
            .await?;
        let status = response.status();
        crate::metrics::observe_github_request(
            "access_token",
            status.as_str(),
            started.elapsed(),
        );

        if !status.is_success() {
            return Err(AppError::OAuth(format!(
                "token endpoint returned {status}"
            )));
        }

        let body: GitHubTokenResponse = response.json().await?;
        match (body.access_token, body.error) {
            (Some(token), _) if !token.is_empty() => Ok(token),
            (_, Some(error)) => Err(AppError::OAuth(format!(
                "token exchange rejected: {error} {}",
                body.error_description.unwrap_or_default()
            ))),
            _ => Err(AppError::OAuth(
                "token response missing access_token".to_string(),
            )),
        }
    }

    async fn api_get<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &'static str,
        access_token: &str,
    ) -> Result<T, AppError> {
        let started = Instant::now();
        let response = self
            .client
            .get(format!("{}{}", self.api_base_url, endpoint))
            .bearer_auth(access_token)
            .header(http::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?;
        let status = response.status();
        crate::metrics::observe_github_request(endpoint, status.as_str(), started.elapsed());

        if !status.is_success() {
            return Err(AppError::OAuth(format!("{endpoint} returned {status}")));
        }

        Ok(response.json().await?)
    }

    async fn primary_email(&self, access_token: &str) -> Option<String> {
        match self
            .api_get::<Vec<GitHubEmail>>("/user/emails", access_token)
            .await
        {
            Ok(emails) => emails
                .into_iter()
                .find(|entry| entry.primary && entry.verified)
                .map(|entry| entry.email),
            Err(error) => {
                tracing::debug!(%error, "Could not read GitHub emails");
                None
            }
        }
    }
}

#[async_trait]
impl OAuthProvider for GitHubProvider {
    fn authorize_url(&self, state: &str) -> String {
        let base = format!("{}/login/oauth/authorize", self.oauth_base_url);
        let params = [
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", self.callback_url.as_str()),
            ("scope", GITHUB_SCOPES),
            ("state", state),
        ];

        match url::Url::parse_with_params(&base, &params) {
            Ok(url) => url.to_string(),
            Err(error) => {
                tracing::error!(%error, base = %base, "Invalid GitHub OAuth base URL");
                base
            }
        }
    }

    async fn exchange_code_for_profile(&self, code: &str) -> Result<ExternalProfile, AppError> {
        let access_token = self.exchange_code(code).await?;
        let user: GitHubUser = self.api_get("/user", &access_token).await?;

        let email = match user.email.filter(|email| !email.is_empty()) {
            Some(email) => Some(email),
            None => self.primary_email(&access_token).await,
        };

        Ok(ExternalProfile {
            id: user.id,
            login: user.login,
            display_name: user.name.filter(|name| !name.is_empty()),
            avatar_url: user.avatar_url,
            email,
            access_token,
        })
    }
}
