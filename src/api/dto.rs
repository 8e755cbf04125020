//! API request and response DTOs
//!
//! Every response wraps its payload in a named envelope
//! (`{"user": ...}`, `{"projects": [...]}`, ...).

use serde::{Deserialize, Serialize};

use crate::data::{File, Project, User};
use crate::service::{NewFileInput, RepoSummary, SignupInput};

// =============================================================================
// Users
// =============================================================================

/// Public view of a user
///
/// Never carries the password hash or the GitHub access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub name: Option<String>,
    pub github_username: Option<String>,
    pub github_avatar: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            name: user.name,
            github_username: user.github_username,
            github_avatar: user.github_avatar,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserEnvelope {
    pub user: UserResponse,
}

impl From<User> for UserEnvelope {
    fn from(user: User) -> Self {
        Self { user: user.into() }
    }
}

/// POST /api/auth/signup
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

impl From<SignupRequest> for SignupInput {
    fn from(request: SignupRequest) -> Self {
        Self {
            username: request.username,
            email: request.email,
            password: request.password,
            name: request.name,
        }
    }
}

/// POST /api/auth/login
///
/// `username` also accepts an email address.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

// =============================================================================
// Projects and files
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateFileRequest {
    pub path: Option<String>,
    pub language: Option<String>,
    pub content: Option<String>,
}

impl From<CreateFileRequest> for NewFileInput {
    fn from(request: CreateFileRequest) -> Self {
        Self {
            path: request.path,
            language: request.language,
            content: request.content,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectEnvelope {
    pub project: Project,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectsEnvelope {
    pub projects: Vec<Project>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FileEnvelope {
    pub file: File,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilesEnvelope {
    pub files: Vec<File>,
}

// =============================================================================
// GitHub
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ReposEnvelope {
    pub repos: Vec<RepoSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn user_response_hides_secrets() {
        let now = Utc::now();
        let user = User {
            id: "01USER".to_string(),
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
            name: None,
            password_hash: Some("$argon2id$secret".to_string()),
            github_id: Some(1),
            github_username: Some("alice-gh".to_string()),
            github_avatar: None,
            github_access_token: Some("sealed".to_string()),
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(UserEnvelope::from(user)).unwrap();
        assert_eq!(json["user"]["username"], "alice");
        assert_eq!(json["user"]["github_username"], "alice-gh");
        assert!(json["user"].get("password_hash").is_none());
        assert!(json["user"].get("github_access_token").is_none());
        assert!(json["user"].get("github_id").is_none());

        let mut keys: Vec<_> = json["user"].as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "email",
                "github_avatar",
                "github_username",
                "id",
                "name",
                "username"
            ]
        );
    }
}
