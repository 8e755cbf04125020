//! Authentication middleware
//!
//! Protects routes that require a signed-in user.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{HeaderMap, Request, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use super::session::{Identity, SESSION_COOKIE, SessionCodec};
use crate::AppState;
use crate::error::AppError;

fn extract_token_from_headers(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .filter(|token| !token.is_empty())
}

/// Resolve the identity proven by the request's session cookie
///
/// No cookie yields `NotAuthenticated`; a cookie the codec rejects
/// yields `InvalidToken`.
fn authenticate(headers: &HeaderMap, codec: &SessionCodec) -> Result<Identity, AppError> {
    let token = extract_token_from_headers(headers).ok_or(AppError::NotAuthenticated)?;
    let claims = codec.verify(&token)?;
    Ok(claims.identity)
}

/// Middleware to require authentication
///
/// Verifies the session cookie and adds the `Identity` to request
/// extensions if valid. Never refreshes the token.
///
/// # Usage
/// ```ignore
/// let protected_routes = Router::new()
///     .route("/api/projects", ...)
///     .layer(middleware::from_fn_with_state(state, require_auth));
/// ```
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let identity = authenticate(request.headers(), &state.sessions)?;

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Extractor for current authenticated user
///
/// Reuses the identity attached by `require_auth` when present, otherwise
/// verifies the cookie itself.
///
/// # Usage
/// ```ignore
/// async fn handler(
///     CurrentUser(identity): CurrentUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}", identity.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>().cloned() {
            return Ok(CurrentUser(identity));
        }

        let state = AppState::from_ref(state);
        let identity = authenticate(&parts.headers, &state.sessions)?;
        parts.extensions.insert(identity.clone());

        Ok(CurrentUser(identity))
    }
}
