//! GitHub repository listing
//!
//! Proxies `GET /user/repos` with the caller's stored token and trims the
//! response to the fields the dashboard renders.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::error::AppError;

const REPOS_ENDPOINT: &str = "/user/repos";
const REPOS_ERROR: &str = "Failed to fetch GitHub repos";

/// Repository entry as returned by GitHub (subset)
#[derive(Debug, Deserialize)]
struct GitHubRepo {
    id: i64,
    name: String,
    full_name: String,
    #[serde(default)]
    private: bool,
    description: Option<String>,
    language: Option<String>,
    html_url: String,
    default_branch: Option<String>,
    pushed_at: Option<String>,
}

/// Repository as exposed by `GET /api/github/repos`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoSummary {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    pub private: bool,
    pub description: Option<String>,
    pub language: Option<String>,
    pub url: String,
    pub default_branch: Option<String>,
    pub pushed_at: Option<String>,
}

impl From<GitHubRepo> for RepoSummary {
    fn from(repo: GitHubRepo) -> Self {
        Self {
            id: repo.id,
            name: repo.name,
            full_name: repo.full_name,
            private: repo.private,
            description: repo.description,
            language: repo.language,
            url: repo.html_url,
            default_branch: repo.default_branch,
            pushed_at: repo.pushed_at,
        }
    }
}

fn upstream<E: ToString>(detail: E) -> AppError {
    AppError::Upstream {
        context: REPOS_ERROR,
        detail: detail.to_string(),
    }
}

/// Repository listing service
pub struct RepoService {
    client: Arc<reqwest::Client>,
    api_base_url: String,
}

impl RepoService {
    pub fn new(client: Arc<reqwest::Client>, api_base_url: &str) -> Self {
        Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// List the token owner's repositories, most recently updated first
    ///
    /// Only the first page (up to 100 repositories) is fetched.
    ///
    /// # Errors
    /// `Upstream` for transport failures, non-2xx responses, and bodies
    /// that do not parse
    pub async fn list_repositories(&self, access_token: &str) -> Result<Vec<RepoSummary>, AppError> {
        let started = Instant::now();
        let response = self
            .client
            .get(format!("{}{}", self.api_base_url, REPOS_ENDPOINT))
            .query(&[("per_page", "100"), ("sort", "updated")])
            .bearer_auth(access_token)
            .header(http::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(upstream)?;
        let status = response.status();
        crate::metrics::observe_github_request(REPOS_ENDPOINT, status.as_str(), started.elapsed());

        if !status.is_success() {
            return Err(upstream(format!("{REPOS_ENDPOINT} returned {status}")));
        }

        let repos: Vec<GitHubRepo> = response.json().await.map_err(upstream)?;
        Ok(repos.into_iter().map(RepoSummary::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn github_fields_map_to_summary() {
        let raw = serde_json::json!({
            "id": 42,
            "name": "vault",
            "full_name": "octocat/vault",
            "private": true,
            "description": null,
            "language": "Rust",
            "html_url": "https://github.com/octocat/vault",
            "default_branch": "main",
            "pushed_at": "2024-05-01T10:00:00Z",
            "stargazers_count": 3
        });
        let repo: GitHubRepo = serde_json::from_value(raw).unwrap();
        let summary = RepoSummary::from(repo);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["fullName"], "octocat/vault");
        assert_eq!(json["url"], "https://github.com/octocat/vault");
        assert_eq!(json["defaultBranch"], "main");
        assert_eq!(json["pushedAt"], "2024-05-01T10:00:00Z");
        assert_eq!(json["private"], true);
        assert!(json.get("stargazers_count").is_none());
    }

    #[tokio::test]
    async fn unreachable_upstream_is_reported_as_fetch_failure() {
        // Nothing listens on port 9 locally
        let service = RepoService::new(Arc::new(reqwest::Client::new()), "http://127.0.0.1:9/");

        let result = service.list_repositories("token").await;
        assert!(matches!(
            result,
            Err(AppError::Upstream { context, .. }) if context == REPOS_ERROR
        ));
    }
}
