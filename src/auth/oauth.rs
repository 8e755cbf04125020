//! GitHub OAuth flow
//!
//! Implements the browser side of the authorization code flow; the code
//! exchange itself is delegated to the configured `OAuthProvider`.

use axum::{
    Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::Engine as _;
use rand::RngCore;
use serde::Deserialize;

use super::session::{Identity, session_cookie};
use crate::AppState;
use crate::error::AppError;
use crate::metrics::record_auth_event;
use crate::service::AccountService;

const OAUTH_STATE_COOKIE: &str = "oauth_state";
const OAUTH_STATE_MAX_AGE_SECONDS: i64 = 600;

/// Create authentication router
///
/// Routes:
/// - GET /auth/github - Redirect to GitHub
/// - GET /auth/github/callback - OAuth callback
/// - GET /auth/failure - Failed sign-in landing
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/github", get(github_redirect))
        .route("/auth/github/callback", get(github_callback))
        .route("/auth/failure", get(auth_failure))
}

/// 302 Found to `location`
fn found(location: &str) -> (StatusCode, [(header::HeaderName, String); 1]) {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())])
}

// =============================================================================
// GitHub OAuth
// =============================================================================

/// GET /auth/github
///
/// Redirects user to GitHub authorization page.
///
/// # Steps
/// 1. Generate CSRF state token
/// 2. Store state in cookie
/// 3. Redirect to GitHub with client_id, redirect_uri, scope, state
async fn github_redirect(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let csrf_state = generate_csrf_state();
    let location = state.oauth.authorize_url(&csrf_state);
    let cookie = build_state_cookie(csrf_state, state.config.should_use_secure_cookies());

    (jar.add(cookie), found(&location))
}

/// Query parameters from GitHub callback
#[derive(Debug, Deserialize)]
struct GitHubCallbackQuery {
    /// Authorization code
    code: Option<String>,
    /// CSRF state token
    state: Option<String>,
    /// Set when the user denied access
    error: Option<String>,
}

/// GET /auth/github/callback
///
/// Handles OAuth callback from GitHub.
///
/// # Steps
/// 1. Verify CSRF state
/// 2. Exchange code for a GitHub profile
/// 3. Link or create the local user
/// 4. Create session and set cookie
/// 5. Redirect to the dashboard
async fn github_callback(
    State(state): State<AppState>,
    Query(query): Query<GitHubCallbackQuery>,
    jar: CookieJar,
) -> Response {
    let result = complete_callback(&state, query, &jar).await;
    // The state is single-use whatever the outcome
    let jar = jar.add(clear_state_cookie());

    match result {
        Ok(token) => {
            record_auth_event("github", "success");
            let jar = jar.add(session_cookie(
                token,
                state.sessions.max_age(),
                state.config.should_use_secure_cookies(),
            ));
            (jar, found(&state.config.client.dashboard_url())).into_response()
        }
        Err(error) => {
            record_auth_event("github", "failure");
            (jar, error).into_response()
        }
    }
}

async fn complete_callback(
    state: &AppState,
    query: GitHubCallbackQuery,
    jar: &CookieJar,
) -> Result<String, AppError> {
    if let Some(error) = query.error {
        return Err(AppError::OAuth(format!("provider returned error: {error}")));
    }

    verify_csrf_state(query.state.as_deref(), jar)?;
    let code = query
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| AppError::OAuth("callback missing code".to_string()))?;

    let profile = state
        .oauth
        .exchange_code_for_profile(&code)
        .await
        .map_err(as_oauth_error)?;

    let user = AccountService::new(state.db.clone(), state.tokens.clone())
        .link_github_profile(&profile)
        .await
        .map_err(as_oauth_error)?;

    tracing::info!(
        user_id = %user.id,
        github_id = profile.id,
        "GitHub sign-in completed"
    );

    state.sessions.issue(&Identity::from(&user))
}

fn as_oauth_error(error: AppError) -> AppError {
    match error {
        AppError::OAuth(_) => error,
        other => AppError::OAuth(other.to_string()),
    }
}

/// GET /auth/failure
async fn auth_failure() -> AppError {
    AppError::OAuth("sign-in aborted".to_string())
}

// =============================================================================
// Helpers
// =============================================================================

/// Generate a random CSRF state token
fn generate_csrf_state() -> String {
    let mut bytes = [0_u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn build_state_cookie(csrf_state: String, secure: bool) -> Cookie<'static> {
    Cookie::build((OAUTH_STATE_COOKIE, csrf_state))
        .path("/auth/github")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(OAUTH_STATE_MAX_AGE_SECONDS))
        .build()
}

fn clear_state_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((OAUTH_STATE_COOKIE, ""))
        .path("/auth/github")
        .http_only(true)
        .build();
    cookie.make_removal();
    cookie
}

/// Verify CSRF state from cookie matches callback state
fn verify_csrf_state(state: Option<&str>, jar: &CookieJar) -> Result<(), AppError> {
    let expected = jar
        .get(OAUTH_STATE_COOKIE)
        .map(|cookie| cookie.value())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::OAuth("missing state cookie".to_string()))?;
    let received = state.ok_or_else(|| AppError::OAuth("missing state parameter".to_string()))?;

    if !constant_time_eq(expected.as_bytes(), received.as_bytes()) {
        return Err(AppError::OAuth("state mismatch".to_string()));
    }

    Ok(())
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0_u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
