//! Project service
//!
//! Projects and the files pasted into them. Every file operation goes
//! through the owning project's ownership check first.

use std::sync::Arc;

use super::ownership::authorize_owned;
use crate::auth::Identity;
use crate::data::{Database, File, Project};
use crate::error::AppError;

fn required_text(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// Fields accepted when adding a file
#[derive(Debug, Clone, Default)]
pub struct NewFileInput {
    pub path: Option<String>,
    pub language: Option<String>,
    pub content: Option<String>,
}

/// Project service
pub struct ProjectService {
    db: Arc<Database>,
}

impl ProjectService {
    /// Create new project service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a project for the caller
    ///
    /// # Errors
    /// `Validation("Project name is required")` if the name is absent or blank
    pub async fn create_project(
        &self,
        owner: &Identity,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<Project, AppError> {
        let name = required_text(name)
            .map(|name| name.trim().to_string())
            .ok_or_else(|| AppError::Validation("Project name is required".to_string()))?;
        let description = description.unwrap_or_default();

        let project = self
            .db
            .create_project(&owner.user_id, &name, &description)
            .await?;

        tracing::info!(project_id = %project.id, user_id = %owner.user_id, "Project created");
        Ok(project)
    }

    /// List the caller's projects, newest first
    pub async fn list_projects(&self, owner: &Identity) -> Result<Vec<Project>, AppError> {
        self.db.list_projects(&owner.user_id).await
    }

    /// Load a project the caller owns
    ///
    /// # Errors
    /// - `NotFound("Project")` if no project has this ID
    /// - `Forbidden` if it belongs to someone else
    pub async fn owned_project(
        &self,
        owner: &Identity,
        project_id: &str,
    ) -> Result<Project, AppError> {
        authorize_owned(
            "Project",
            self.db.get_project(project_id),
            |project: &Project| project.user_id.as_str(),
            owner,
        )
        .await
    }

    /// List files in one of the caller's projects, oldest first
    pub async fn list_files(&self, owner: &Identity, project_id: &str) -> Result<Vec<File>, AppError> {
        let project = self.owned_project(owner, project_id).await?;
        self.db.list_files(&project.id).await
    }

    /// Add a file to one of the caller's projects
    ///
    /// Input is validated before the project is looked up, so a malformed
    /// body is a 400 regardless of the project ID.
    pub async fn add_file(
        &self,
        owner: &Identity,
        project_id: &str,
        input: NewFileInput,
    ) -> Result<File, AppError> {
        let (path, content) = match (required_text(input.path), input.content) {
            (Some(path), Some(content)) if !content.is_empty() => (path, content),
            _ => {
                return Err(AppError::Validation(
                    "path and content are required".to_string(),
                ));
            }
        };
        let language = required_text(input.language);

        let project = self.owned_project(owner, project_id).await?;
        let file = self
            .db
            .create_file(&project.id, &path, language.as_deref(), &content)
            .await?;

        tracing::debug!(file_id = %file.id, project_id = %project.id, "File added");
        Ok(file)
    }
}
