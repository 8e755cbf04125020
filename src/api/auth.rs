//! Password authentication endpoints

use axum::{extract::State, response::Json};
use axum_extra::extract::CookieJar;

use super::dto::{LoginRequest, OkResponse, SignupRequest, UserEnvelope};
use super::extract::JsonBody;
use crate::AppState;
use crate::auth::{CurrentUser, Identity, clear_session_cookie, session_cookie};
use crate::data::User;
use crate::error::AppError;
use crate::metrics::record_auth_event;
use crate::service::AccountService;

fn accounts(state: &AppState) -> AccountService {
    AccountService::new(state.db.clone(), state.tokens.clone())
}

/// Issue a session for `user` and attach it to the jar
fn start_session(state: &AppState, jar: CookieJar, user: &User) -> Result<CookieJar, AppError> {
    let token = state.sessions.issue(&Identity::from(user))?;
    Ok(jar.add(session_cookie(
        token,
        state.sessions.max_age(),
        state.config.should_use_secure_cookies(),
    )))
}

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(request): JsonBody<SignupRequest>,
) -> Result<(CookieJar, Json<UserEnvelope>), AppError> {
    let user = match accounts(&state).signup(request.into()).await {
        Ok(user) => user,
        Err(error) => {
            record_auth_event("signup", "failure");
            return Err(error);
        }
    };
    record_auth_event("signup", "success");

    let jar = start_session(&state, jar, &user)?;
    Ok((jar, Json(user.into())))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<(CookieJar, Json<UserEnvelope>), AppError> {
    let user = match accounts(&state)
        .login(request.username, request.password)
        .await
    {
        Ok(user) => user,
        Err(error) => {
            record_auth_event("password", "failure");
            return Err(error);
        }
    };
    record_auth_event("password", "success");
    tracing::info!(user_id = %user.id, "Password sign-in");

    let jar = start_session(&state, jar, &user)?;
    Ok((jar, Json(user.into())))
}

/// POST /api/auth/logout
///
/// Always succeeds; the token itself stays valid until it expires.
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<OkResponse>) {
    (jar.add(clear_session_cookie()), Json(OkResponse { ok: true }))
}

/// GET /api/me
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<UserEnvelope>, AppError> {
    // A valid token for a user that no longer exists is treated as invalid
    let user = state
        .db
        .get_user(&identity.user_id)
        .await?
        .ok_or(AppError::InvalidToken)?;

    Ok(Json(user.into()))
}
