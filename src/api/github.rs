//! GitHub proxy endpoints

use axum::{extract::State, response::Json};

use super::dto::ReposEnvelope;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::service::{AccountService, RepoService};

/// GET /api/github/repos
///
/// Lists the caller's GitHub repositories using their stored token.
pub async fn list_repos(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<ReposEnvelope>, AppError> {
    let accounts = AccountService::new(state.db.clone(), state.tokens.clone());
    let user = accounts.get_user(&identity.user_id).await?;
    let access_token = accounts.github_access_token(&user)?;

    let repos = RepoService::new(state.http_client.clone(), &state.config.github.api_base_url)
        .list_repositories(&access_token)
        .await?;

    tracing::debug!(user_id = %user.id, count = repos.len(), "Listed GitHub repositories");
    Ok(Json(ReposEnvelope { repos }))
}
