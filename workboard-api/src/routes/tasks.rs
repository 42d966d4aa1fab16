//! Task endpoints
//!
//! - `POST /api/projects/:project_id/tasks`
//! - `GET /api/projects/:project_id/tasks`
//! - `PUT /api/tasks/:task_id`
//! - `PATCH /api/tasks/:task_id/status`

use axum::{extract::State, http::StatusCode, Json};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;
use workboard_shared::models::task::{TaskPriority, TaskStatus};
use workboard_shared::services::tasks::{
    NewTask, TaskChanges, TaskQuery, TaskView, DEFAULT_TASK_PAGE,
};

use super::double_option;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{AppJson, AppPath, AppQuery, Authenticated, Paging},
    response::ApiResponse,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Task title must be between 1 and 255 characters"))]
    pub title: String,

    pub description: Option<String>,

    /// Defaults to `medium`
    pub priority: Option<TaskPriority>,

    pub assigned_to: Option<Uuid>,

    /// `YYYY-MM-DD`
    pub due_date: Option<NaiveDate>,
}

/// Absent fields are untouched; `null` clears the nullable ones
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Task title must be between 1 and 255 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,

    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<Uuid>>,

    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Uuid>,

    /// Substring of the title
    pub search: Option<String>,
}

pub async fn create_task(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    AppPath(project_id): AppPath<Uuid>,
    AppJson(req): AppJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<TaskView>>)> {
    req.validate()?;

    let task = state
        .tasks
        .create(
            &caller,
            project_id,
            NewTask {
                title: req.title,
                description: req.description,
                priority: req.priority,
                assigned_to: req.assigned_to,
                due_date: req.due_date,
            },
        )
        .await?;

    Ok(ApiResponse::created("Task created successfully", task))
}

/// Ordered by priority (high first), then due date
pub async fn list_tasks(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    AppPath(project_id): AppPath<Uuid>,
    AppQuery(paging): AppQuery<Paging>,
    AppQuery(query): AppQuery<TaskListQuery>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    let listing = state
        .tasks
        .list(
            &caller.auth,
            project_id,
            TaskQuery {
                status: query.status,
                priority: query.priority,
                assigned_to: query.assigned_to,
                search: query.search,
            },
            paging.request(DEFAULT_TASK_PAGE),
        )
        .await?;

    Ok(ApiResponse::data(json!({
        "tasks": listing.items,
        "pagination": listing.pagination,
    })))
}

pub async fn update_task(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    AppPath(task_id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdateTaskRequest>,
) -> ApiResult<Json<ApiResponse<TaskView>>> {
    req.validate()?;

    let task = state
        .tasks
        .update(
            &caller,
            task_id,
            TaskChanges {
                title: req.title,
                description: req.description,
                status: req.status,
                priority: req.priority,
                assigned_to: req.assigned_to,
                due_date: req.due_date,
            },
        )
        .await?;

    Ok(ApiResponse::with_message("Task updated successfully", task))
}

/// Setting the current status again succeeds without change
pub async fn update_task_status(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    AppPath(task_id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdateStatusRequest>,
) -> ApiResult<Json<ApiResponse<TaskView>>> {
    let status = req
        .status
        .ok_or_else(|| ApiError::BadRequest("Status is required".to_string()))?;

    let task = state.tasks.update_status(&caller, task_id, status).await?;

    Ok(ApiResponse::with_message("Task status updated successfully", task))
}
