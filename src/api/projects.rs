//! Project and file endpoints

use axum::{
    extract::{Path, State},
    response::Json,
};

use super::dto::{
    CreateFileRequest, CreateProjectRequest, FileEnvelope, FilesEnvelope, ProjectEnvelope,
    ProjectsEnvelope,
};
use super::extract::JsonBody;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::service::ProjectService;

fn projects(state: &AppState) -> ProjectService {
    ProjectService::new(state.db.clone())
}

/// POST /api/projects
pub async fn create_project(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    JsonBody(request): JsonBody<CreateProjectRequest>,
) -> Result<Json<ProjectEnvelope>, AppError> {
    let project = projects(&state)
        .create_project(&identity, request.name, request.description)
        .await?;

    Ok(Json(ProjectEnvelope { project }))
}

/// GET /api/projects
/// Caller's projects, newest first
pub async fn list_projects(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<ProjectsEnvelope>, AppError> {
    let projects = projects(&state).list_projects(&identity).await?;
    Ok(Json(ProjectsEnvelope { projects }))
}

/// GET /api/projects/:id/files
/// Files in insertion order
pub async fn list_files(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(project_id): Path<String>,
) -> Result<Json<FilesEnvelope>, AppError> {
    let files = projects(&state)
        .list_files(&identity, &project_id)
        .await?;
    Ok(Json(FilesEnvelope { files }))
}

/// POST /api/projects/:id/files
pub async fn create_file(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(project_id): Path<String>,
    JsonBody(request): JsonBody<CreateFileRequest>,
) -> Result<Json<FileEnvelope>, AppError> {
    let file = projects(&state)
        .add_file(&identity, &project_id, request.into())
        .await?;

    Ok(Json(FileEnvelope { file }))
}
