//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// User
// =============================================================================

/// A vault user
///
/// Local accounts carry a `password_hash`; accounts created through
/// GitHub sign-in have none until one is set.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub name: Option<String>,
    /// Argon2id PHC string
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub github_id: Option<i64>,
    pub github_username: Option<String>,
    pub github_avatar: Option<String>,
    /// AES-GCM sealed GitHub access token
    #[serde(skip_serializing)]
    pub github_access_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a user created by password signup
#[derive(Debug, Clone)]
pub struct NewLocalUser {
    pub username: String,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
}

/// GitHub identity attached to a user on sign-in
#[derive(Debug, Clone)]
pub struct GitHubLink {
    pub github_id: i64,
    pub github_username: String,
    pub github_avatar: Option<String>,
    /// Already sealed with the token cipher
    pub sealed_access_token: String,
}

// =============================================================================
// Project
// =============================================================================

/// A named collection of files owned by one user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// File
// =============================================================================

/// A pasted source file inside a project
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct File {
    pub id: String,
    pub project_id: String,
    pub path: String,
    pub language: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
