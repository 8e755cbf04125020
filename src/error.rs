//! Error types for CodeVault
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
///
/// This enum represents all possible errors that can occur
/// in the application. It implements `IntoResponse` to
/// automatically convert errors to appropriate HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (404)
    #[error("{0} not found")]
    NotFound(&'static str),

    /// No session cookie on the request (401)
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Session cookie present but not acceptable (401)
    #[error("Invalid token")]
    InvalidToken,

    /// Access denied (403)
    #[error("Forbidden")]
    Forbidden,

    /// Validation error (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Login failed; deliberately the same for unknown users and bad passwords (400)
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Unique constraint violated on create (400)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Account has no stored GitHub token (400)
    #[error("GitHub not connected for this user")]
    GitHubNotConnected,

    /// GitHub sign-in failed (401)
    #[error("GitHub auth failed: {0}")]
    OAuth(String),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Upstream API error (500)
    ///
    /// `context` is shown to the caller, `detail` is only logged.
    #[error("{context}: {detail}")]
    Upstream {
        context: &'static str,
        detail: String,
    },

    /// HTTP client error (500)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Encryption/decryption error (500)
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// Map a failed insert to `Conflict` when a unique constraint was hit.
    pub fn from_insert(err: sqlx::Error, message: &str) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(message.to_string())
            }
            _ => AppError::Database(err),
        }
    }

    /// Whether this error hides its detail from the caller.
    fn is_server_error(&self) -> bool {
        matches!(
            self,
            AppError::Database(_)
                | AppError::Upstream { .. }
                | AppError::HttpClient(_)
                | AppError::Config(_)
                | AppError::Encryption(_)
                | AppError::Internal(_)
        )
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to appropriate HTTP status code
    /// and JSON error body.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_message, error_type) = match &self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string(), "not_found"),
            AppError::NotAuthenticated => (
                StatusCode::UNAUTHORIZED,
                self.to_string(),
                "not_authenticated",
            ),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, self.to_string(), "invalid_token"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, self.to_string(), "forbidden"),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "validation"),
            AppError::InvalidCredentials => (
                StatusCode::BAD_REQUEST,
                self.to_string(),
                "invalid_credentials",
            ),
            AppError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "conflict"),
            AppError::GitHubNotConnected => (
                StatusCode::BAD_REQUEST,
                self.to_string(),
                "github_not_connected",
            ),
            AppError::OAuth(_) => (
                StatusCode::UNAUTHORIZED,
                "GitHub auth failed".to_string(),
                "oauth",
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
                "database",
            ),
            AppError::Upstream { context, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                context.to_string(),
                "upstream",
            ),
            AppError::HttpClient(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Upstream request failed".to_string(),
                "http_client",
            ),
            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server misconfigured".to_string(),
                "config",
            ),
            AppError::Encryption(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                "encryption",
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                "internal",
            ),
        };

        if self.is_server_error() {
            tracing::error!(error = %self, error_type, "Request failed");
        } else if let AppError::OAuth(detail) = &self {
            tracing::warn!(%detail, "GitHub sign-in rejected");
        }

        // Record error metric
        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[error_type]).inc();

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn auth_errors_map_to_401_with_fixed_messages() {
        let response = AppError::NotAuthenticated.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "Not authenticated");

        let response = AppError::InvalidToken.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "Invalid token");
    }

    #[tokio::test]
    async fn not_found_names_the_resource() {
        let response = AppError::NotFound("Project").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "Project not found");
    }

    #[tokio::test]
    async fn server_errors_do_not_leak_detail() {
        let response = AppError::Upstream {
            context: "Failed to fetch GitHub repos",
            detail: "api.github.com returned 502: secret detail".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Failed to fetch GitHub repos");
    }

    #[tokio::test]
    async fn oauth_errors_hide_detail() {
        let response = AppError::OAuth("state mismatch".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "GitHub auth failed");
    }

    #[tokio::test]
    async fn credential_errors_are_bad_request() {
        let response = AppError::InvalidCredentials.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"],
            "Invalid username or password"
        );
    }
}
