//! SQLite database operations
//!
//! All database access goes through this module.
//! Uses SQLx with runtime-checked queries.

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use super::models::*;
use crate::error::AppError;

const USER_CONFLICT_MESSAGE: &str = "Username or email already in use";

/// Pool sizing and timeouts
#[derive(Debug, Clone, Copy)]
pub struct PoolOptions {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&crate::config::DatabaseConfig> for PoolOptions {
    fn from(config: &crate::config::DatabaseConfig) -> Self {
        Self {
            max_connections: config.max_connections.max(1),
            acquire_timeout: Duration::from_secs(config.acquire_timeout_seconds.max(1)),
        }
    }
}

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Connect to SQLite database with default pool options
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        Self::connect_with_options(path, PoolOptions::default()).await
    }

    /// Connect to SQLite database with explicit pool sizing and timeouts.
    pub async fn connect_with_options(path: &Path, options: PoolOptions) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connect_options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect_with(connect_options)
            .await?;

        // Run migrations
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Get a user by ID
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Find a user by username or email
    ///
    /// An exact username match takes precedence over an email match so a
    /// username that looks like someone else's email cannot shadow them.
    pub async fn get_user_by_login(&self, identifier: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE username = ?1 OR email = ?1
            ORDER BY CASE WHEN username = ?1 THEN 0 ELSE 1 END
            LIMIT 1
            "#,
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find a user by linked GitHub account ID
    pub async fn get_user_by_github_id(&self, github_id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE github_id = ?")
            .bind(github_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Find a user by email
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Check whether a username is taken
    pub async fn username_exists(&self, username: &str) -> Result<bool, AppError> {
        let exists: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists != 0)
    }

    /// Insert a password-based user
    ///
    /// # Errors
    /// Returns `AppError::Conflict` if the username or email is taken
    pub async fn create_local_user(&self, new_user: &NewLocalUser) -> Result<User, AppError> {
        let now = Utc::now();
        let user = User {
            id: EntityId::new().0,
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            name: new_user.name.clone(),
            password_hash: Some(new_user.password_hash.clone()),
            github_id: None,
            github_username: None,
            github_avatar: None,
            github_access_token: None,
            created_at: now,
            updated_at: now,
        };

        self.insert_user(&user).await?;
        Ok(user)
    }

    /// Insert a user seeded from a GitHub profile
    ///
    /// # Errors
    /// Returns `AppError::Conflict` if the username, email or GitHub ID is taken
    pub async fn create_github_user(
        &self,
        username: &str,
        email: &str,
        name: Option<&str>,
        link: &GitHubLink,
    ) -> Result<User, AppError> {
        let now = Utc::now();
        let user = User {
            id: EntityId::new().0,
            username: username.to_string(),
            email: email.to_string(),
            name: name.map(ToOwned::to_owned),
            password_hash: None,
            github_id: Some(link.github_id),
            github_username: Some(link.github_username.clone()),
            github_avatar: link.github_avatar.clone(),
            github_access_token: Some(link.sealed_access_token.clone()),
            created_at: now,
            updated_at: now,
        };

        self.insert_user(&user).await?;
        Ok(user)
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, email, name, password_hash, github_id,
                github_username, github_avatar, github_access_token,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.github_id)
        .bind(&user.github_username)
        .bind(&user.github_avatar)
        .bind(&user.github_access_token)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::from_insert(e, USER_CONFLICT_MESSAGE))?;

        Ok(())
    }

    /// Attach (or refresh) the GitHub identity and token on an existing user
    ///
    /// # Returns
    /// The updated user, or `NotFound` if the user vanished
    pub async fn update_github_link(
        &self,
        user_id: &str,
        link: &GitHubLink,
    ) -> Result<User, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET github_id = ?, github_username = ?, github_avatar = ?,
                github_access_token = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(link.github_id)
        .bind(&link.github_username)
        .bind(&link.github_avatar)
        .bind(&link.sealed_access_token)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::from_insert(e, "GitHub account already linked"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User"));
        }

        self.get_user(user_id).await?.ok_or(AppError::NotFound("User"))
    }

    // =========================================================================
    // Projects
    // =========================================================================

    /// Create a project owned by `user_id`
    pub async fn create_project(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
    ) -> Result<Project, AppError> {
        let project = Project {
            id: EntityId::new().0,
            user_id: user_id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO projects (id, user_id, name, description, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&project.id)
        .bind(&project.user_id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.created_at)
        .execute(&self.pool)
        .await?;

        Ok(project)
    }

    /// Get a project by ID
    pub async fn get_project(&self, id: &str) -> Result<Option<Project>, AppError> {
        let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(project)
    }

    /// List a user's projects, newest first
    pub async fn list_projects(&self, user_id: &str) -> Result<Vec<Project>, AppError> {
        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT * FROM projects
            WHERE user_id = ?
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(projects)
    }

    // =========================================================================
    // Files
    // =========================================================================

    /// Add a file to a project
    pub async fn create_file(
        &self,
        project_id: &str,
        path: &str,
        language: Option<&str>,
        content: &str,
    ) -> Result<File, AppError> {
        let file = File {
            id: EntityId::new().0,
            project_id: project_id.to_string(),
            path: path.to_string(),
            language: language.map(ToOwned::to_owned),
            content: content.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO files (id, project_id, path, language, content, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&file.id)
        .bind(&file.project_id)
        .bind(&file.path)
        .bind(&file.language)
        .bind(&file.content)
        .bind(file.created_at)
        .execute(&self.pool)
        .await?;

        Ok(file)
    }

    /// List a project's files in insertion order
    pub async fn list_files(&self, project_id: &str) -> Result<Vec<File>, AppError> {
        let files = sqlx::query_as::<_, File>(
            r#"
            SELECT * FROM files
            WHERE project_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(files)
    }
}
