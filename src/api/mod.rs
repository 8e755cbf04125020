//! API layer
//!
//! HTTP handlers for:
//! - Password authentication (`/api/auth/*`, `/api/me`)
//! - Projects and files
//! - GitHub repository proxy
//! - Metrics (Prometheus)

mod auth;
mod dto;
mod extract;
mod github;
pub mod metrics;
mod projects;

pub use dto::*;
pub use extract::JsonBody;
pub use metrics::metrics_router;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::AppState;
use crate::auth::require_auth;

/// Create the `/api` router
///
/// Routes are split into public and authenticated endpoints.
pub fn api_router(state: AppState) -> Router<AppState> {
    // Public endpoints (no session required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout));

    // Authenticated endpoints (valid session cookie)
    let authenticated_routes = Router::new()
        .route("/me", get(auth::me))
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/projects/:id/files",
            get(projects::list_files).post(projects::create_file),
        )
        .route("/github/repos", get(github::list_repos))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    public_routes.merge(authenticated_routes)
}
