//! Account service
//!
//! Handles password signup/login and linking GitHub identities to users.

use std::sync::Arc;

use crate::auth::{ExternalProfile, TokenCipher, password};
use crate::data::{Database, GitHubLink, NewLocalUser, User};
use crate::error::AppError;

fn normalize_optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn missing_fields() -> AppError {
    AppError::Validation("Missing fields".to_string())
}

/// Fields accepted by password signup
#[derive(Debug, Clone, Default)]
pub struct SignupInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

/// Account service
pub struct AccountService {
    db: Arc<Database>,
    tokens: Arc<TokenCipher>,
}

impl AccountService {
    /// Create new account service
    pub fn new(db: Arc<Database>, tokens: Arc<TokenCipher>) -> Self {
        Self { db, tokens }
    }

    /// Get a user by ID
    pub async fn get_user(&self, user_id: &str) -> Result<User, AppError> {
        self.db
            .get_user(user_id)
            .await?
            .ok_or(AppError::NotFound("User"))
    }

    /// Register a password-based account
    ///
    /// # Errors
    /// - `Validation("Missing fields")` if username, email or password is absent
    /// - `Conflict` if the username or email is taken
    pub async fn signup(&self, input: SignupInput) -> Result<User, AppError> {
        let username = normalize_optional_text(input.username).ok_or_else(missing_fields)?;
        let email = normalize_optional_text(input.email).ok_or_else(missing_fields)?;
        let plaintext = input
            .password
            .filter(|password| !password.is_empty())
            .ok_or_else(missing_fields)?;

        let password_hash =
            tokio::task::spawn_blocking(move || password::hash_password(&plaintext))
                .await
                .map_err(|e| AppError::Internal(e.into()))??;

        let user = self
            .db
            .create_local_user(&NewLocalUser {
                username,
                email,
                name: normalize_optional_text(input.name),
                password_hash,
            })
            .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "Account created");
        Ok(user)
    }

    /// Check a username-or-email and password
    ///
    /// Unknown accounts, accounts without a password, and wrong passwords
    /// all fail with the same `InvalidCredentials`.
    pub async fn login(
        &self,
        identifier: Option<String>,
        plaintext: Option<String>,
    ) -> Result<User, AppError> {
        let identifier = normalize_optional_text(identifier).ok_or_else(missing_fields)?;
        let plaintext = plaintext
            .filter(|password| !password.is_empty())
            .ok_or_else(missing_fields)?;

        let user = self
            .db
            .get_user_by_login(&identifier)
            .await?
            .ok_or(AppError::InvalidCredentials)?;
        let digest = user
            .password_hash
            .clone()
            .ok_or(AppError::InvalidCredentials)?;

        let verified =
            tokio::task::spawn_blocking(move || password::verify_password(&plaintext, &digest))
                .await
                .map_err(|e| AppError::Internal(e.into()))?;
        if !verified {
            return Err(AppError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Attach a GitHub profile to a user, creating one if needed
    ///
    /// # Lookup order
    /// 1. User already linked to this GitHub ID
    /// 2. User with the same email (merges a local account)
    /// 3. Otherwise a new user seeded from the profile
    ///
    /// Repeated sign-ins refresh the stored profile and token in place.
    pub async fn link_github_profile(&self, profile: &ExternalProfile) -> Result<User, AppError> {
        let link = GitHubLink {
            github_id: profile.id,
            github_username: profile.login.clone(),
            github_avatar: profile.avatar_url.clone(),
            sealed_access_token: self.tokens.seal(&profile.access_token)?,
        };
        let email = profile.email_or_placeholder();

        let existing = match self.db.get_user_by_github_id(profile.id).await? {
            Some(user) => Some(user),
            None => self.db.get_user_by_email(&email).await?,
        };

        if let Some(user) = existing {
            let updated = self.db.update_github_link(&user.id, &link).await?;
            tracing::info!(
                user_id = %updated.id,
                github_username = %profile.login,
                "GitHub account linked"
            );
            return Ok(updated);
        }

        // GitHub logins can collide with local usernames
        let username = if self.db.username_exists(&profile.login).await? {
            format!("{}-{}", profile.login, profile.id)
        } else {
            profile.login.clone()
        };
        let name = profile.display_name.as_deref().unwrap_or(&profile.login);

        let user = self
            .db
            .create_github_user(&username, &email, Some(name), &link)
            .await?;
        tracing::info!(
            user_id = %user.id,
            username = %user.username,
            "Account created from GitHub profile"
        );
        Ok(user)
    }

    /// Decrypt the user's stored GitHub access token
    ///
    /// # Errors
    /// `GitHubNotConnected` if none is stored or it can no longer be opened
    pub fn github_access_token(&self, user: &User) -> Result<String, AppError> {
        let sealed = user
            .github_access_token
            .as_deref()
            .ok_or(AppError::GitHubNotConnected)?;

        self.tokens.open(sealed).map_err(|error| {
            tracing::warn!(user_id = %user.id, %error, "Stored GitHub token is unreadable");
            AppError::GitHubNotConnected
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn service() -> (AccountService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::connect(&temp_dir.path().join("test.db"))
            .await
            .unwrap();
        let tokens = TokenCipher::new(&[3_u8; 32]).unwrap();
        (AccountService::new(Arc::new(db), Arc::new(tokens)), temp_dir)
    }

    fn signup_input(username: &str, email: &str, password: &str) -> SignupInput {
        SignupInput {
            username: Some(username.to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
            name: None,
        }
    }

    fn github_profile(id: i64, login: &str, email: Option<&str>) -> ExternalProfile {
        ExternalProfile {
            id,
            login: login.to_string(),
            display_name: None,
            avatar_url: None,
            email: email.map(ToOwned::to_owned),
            access_token: format!("gho_{id}"),
        }
    }

    #[tokio::test]
    async fn signup_requires_username_email_and_password() {
        let (service, _temp_dir) = service().await;

        for input in [
            signup_input("", "a@x.com", "pw"),
            signup_input("alice", "  ", "pw"),
            signup_input("alice", "a@x.com", ""),
            SignupInput::default(),
        ] {
            let result = service.signup(input).await;
            assert!(
                matches!(result, Err(AppError::Validation(ref message)) if message == "Missing fields")
            );
        }
    }

    #[tokio::test]
    async fn signup_then_login_by_username_or_email() {
        let (service, _temp_dir) = service().await;

        let user = service
            .signup(signup_input("alice", "a@x.com", "pw123456"))
            .await
            .unwrap();
        assert_ne!(user.password_hash.as_deref(), Some("pw123456"));

        let by_name = service
            .login(Some("alice".to_string()), Some("pw123456".to_string()))
            .await
            .unwrap();
        assert_eq!(by_name.id, user.id);

        let by_email = service
            .login(Some("a@x.com".to_string()), Some("pw123456".to_string()))
            .await
            .unwrap();
        assert_eq!(by_email.id, user.id);
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let (service, _temp_dir) = service().await;
        service
            .signup(signup_input("alice", "a@x.com", "pw123456"))
            .await
            .unwrap();
        service
            .link_github_profile(&github_profile(1, "octo", None))
            .await
            .unwrap();

        let wrong_password = service
            .login(Some("alice".to_string()), Some("nope".to_string()))
            .await;
        let unknown_user = service
            .login(Some("nobody".to_string()), Some("pw123456".to_string()))
            .await;
        let oauth_only = service
            .login(Some("octo".to_string()), Some("pw123456".to_string()))
            .await;

        assert!(matches!(wrong_password, Err(AppError::InvalidCredentials)));
        assert!(matches!(unknown_user, Err(AppError::InvalidCredentials)));
        assert!(matches!(oauth_only, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn github_login_merges_with_local_account_by_email() {
        let (service, _temp_dir) = service().await;
        let local = service
            .signup(signup_input("alice", "a@x.com", "pw123456"))
            .await
            .unwrap();

        let linked = service
            .link_github_profile(&github_profile(77, "alice-gh", Some("a@x.com")))
            .await
            .unwrap();

        assert_eq!(linked.id, local.id);
        assert_eq!(linked.github_id, Some(77));
        assert_eq!(service.github_access_token(&linked).unwrap(), "gho_77");
        // Password login keeps working after linking
        assert!(
            service
                .login(Some("alice".to_string()), Some("pw123456".to_string()))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn repeated_github_login_updates_in_place() {
        let (service, _temp_dir) = service().await;

        let first = service
            .link_github_profile(&github_profile(5, "octo", None))
            .await
            .unwrap();
        let mut refreshed = github_profile(5, "octo-renamed", None);
        refreshed.access_token = "gho_new".to_string();
        let second = service.link_github_profile(&refreshed).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.email, "octo@github.local");
        assert_eq!(second.github_username.as_deref(), Some("octo-renamed"));
        assert_eq!(service.github_access_token(&second).unwrap(), "gho_new");
    }

    #[tokio::test]
    async fn github_user_gets_suffixed_username_on_collision() {
        let (service, _temp_dir) = service().await;
        service
            .signup(signup_input("octo", "local@x.com", "pw123456"))
            .await
            .unwrap();

        let created = service
            .link_github_profile(&github_profile(9, "octo", Some("gh@x.com")))
            .await
            .unwrap();

        assert_eq!(created.username, "octo-9");
        assert_eq!(created.name.as_deref(), Some("octo"));
        assert!(created.password_hash.is_none());
    }

    #[tokio::test]
    async fn local_user_is_not_connected_to_github() {
        let (service, _temp_dir) = service().await;
        let user = service
            .signup(signup_input("alice", "a@x.com", "pw123456"))
            .await
            .unwrap();

        assert!(matches!(
            service.github_access_token(&user),
            Err(AppError::GitHubNotConnected)
        ));
    }
}
