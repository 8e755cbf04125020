//! Authentication
//!
//! Handles:
//! - Password hashing
//! - Session tokens and cookies
//! - Authentication middleware
//! - GitHub OAuth flow

mod cipher;
mod middleware;
mod oauth;
pub mod password;
mod provider;
pub mod session;

pub use cipher::TokenCipher;
pub use middleware::{CurrentUser, require_auth};
pub use oauth::auth_router;
#[cfg(test)]
pub use provider::MockOAuthProvider;
pub use provider::{ExternalProfile, GITHUB_SCOPES, GitHubProvider, OAuthProvider};
pub use session::{
    Claims, Identity, SESSION_COOKIE, SessionCodec, clear_session_cookie, session_cookie,
};
