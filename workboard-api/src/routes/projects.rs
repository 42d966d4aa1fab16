//! Project endpoints
//!
//! - `POST /api/projects`
//! - `GET /api/projects`
//! - `PUT /api/projects/:project_id`
//! - `DELETE /api/projects/:project_id`

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;
use workboard_shared::models::project::ProjectStatus;
use workboard_shared::services::projects::{
    NewProject, ProjectChanges, ProjectQuery, ProjectView, DEFAULT_PROJECT_PAGE,
};

use super::double_option;
use crate::{
    app::AppState,
    error::ApiResult,
    extract::{AppJson, AppPath, AppQuery, Authenticated, Paging},
    response::ApiResponse,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Project name must be between 1 and 255 characters"))]
    pub name: String,

    pub description: Option<String>,

    /// Defaults to `active`
    pub status: Option<ProjectStatus>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Project name must be between 1 and 255 characters"))]
    pub name: Option<String>,

    /// `null` clears it
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub status: Option<ProjectStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProjectListQuery {
    pub status: Option<ProjectStatus>,

    /// Substring of the name
    pub search: Option<String>,
}

/// `POST /api/projects`
///
/// # Errors
///
/// - `403` for a super_admin, or once the tenant holds `maxProjects`
pub async fn create_project(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    AppJson(req): AppJson<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ProjectView>>)> {
    req.validate()?;

    let project = state
        .projects
        .create(
            &caller,
            NewProject {
                name: req.name,
                description: req.description,
                status: req.status,
            },
        )
        .await?;

    Ok(ApiResponse::created("Project created successfully", project))
}

pub async fn list_projects(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    AppQuery(paging): AppQuery<Paging>,
    AppQuery(query): AppQuery<ProjectListQuery>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    let listing = state
        .projects
        .list(
            &caller.auth,
            ProjectQuery {
                status: query.status,
                search: query.search,
            },
            paging.request(DEFAULT_PROJECT_PAGE),
        )
        .await?;

    Ok(ApiResponse::data(json!({
        "projects": listing.items,
        "pagination": listing.pagination,
    })))
}

/// Plain users may only edit projects they created
pub async fn update_project(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    AppPath(project_id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdateProjectRequest>,
) -> ApiResult<Json<ApiResponse<ProjectView>>> {
    req.validate()?;

    let project = state
        .projects
        .update(
            &caller,
            project_id,
            ProjectChanges {
                name: req.name,
                description: req.description,
                status: req.status,
            },
        )
        .await?;

    Ok(ApiResponse::with_message("Project updated successfully", project))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    AppPath(project_id): AppPath<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state.projects.delete(&caller, project_id).await?;
    Ok(ApiResponse::message("Project deleted successfully"))
}
