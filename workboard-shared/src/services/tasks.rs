//! Task management

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::{optional_text, required_text, Caller, Listing, ServiceResult};
use crate::audit::{AuditAction, AuditRecorder, EntityType};
use crate::auth::authorization::{require, Action, FieldScope, Resource};
use crate::auth::verifier::AuthContext;
use crate::error::{is_foreign_key_violation, ServiceError};
use crate::models::account::Account;
use crate::models::pagination::PageRequest;
use crate::models::project::Project;
use crate::models::task::{
    CreateTask, Task, TaskFilter, TaskPriority, TaskStatus, TaskSummary, UpdateTask,
};

/// Default page size for task listings
pub const DEFAULT_TASK_PAGE: i64 = 50;

/// Foreign key from `tasks.assigned_to` to `users.id`
pub const ASSIGNEE_FOREIGN_KEY: &str = "tasks_assigned_to_fkey";

const ASSIGNEE_NOT_FOUND: &str = "Assigned user not found";

/// An assignee deleted between the check and the write trips the foreign key
fn assignee_write_error(err: sqlx::Error) -> ServiceError {
    if is_foreign_key_violation(&err, ASSIGNEE_FOREIGN_KEY) {
        ServiceError::invalid(ASSIGNEE_NOT_FOUND)
    } else {
        ServiceError::from(err)
    }
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
}

/// Requested task changes; `Some(None)` clears a nullable field
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Option<Uuid>>,
    pub due_date: Option<Option<NaiveDate>>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Uuid>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: Uuid,
    pub project_id: Uuid,
    pub tenant_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Task> for TaskView {
    fn from(t: Task) -> Self {
        Self {
            id: t.id,
            project_id: t.project_id,
            tenant_id: t.tenant_id,
            title: t.title,
            description: t.description,
            status: t.status,
            priority: t.priority,
            assigned_to: t.assigned_to,
            due_date: t.due_date,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignee {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListItem {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assignee: Option<Assignee>,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TaskSummary> for TaskListItem {
    fn from(t: TaskSummary) -> Self {
        let assignee = match (t.assigned_to, t.assignee_name, t.assignee_email) {
            (Some(id), Some(full_name), Some(email)) => Some(Assignee {
                id,
                full_name,
                email,
            }),
            _ => None,
        };

        Self {
            id: t.id,
            project_id: t.project_id,
            title: t.title,
            description: t.description,
            status: t.status,
            priority: t.priority,
            assignee,
            due_date: t.due_date,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct TaskService {
    db: PgPool,
    audit: AuditRecorder,
}

impl TaskService {
    pub fn new(db: PgPool, audit: AuditRecorder) -> Self {
        Self { db, audit }
    }

    async fn load_project(&self, project_id: Uuid) -> ServiceResult<Project> {
        Project::find_by_id(&self.db, project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project not found"))
    }

    async fn load_task(&self, task_id: Uuid) -> ServiceResult<Task> {
        Task::find_by_id(&self.db, task_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Task not found"))
    }

    /// The assignee must be an account of the task's tenant
    async fn check_assignee(&self, tenant_id: Uuid, assignee_id: Uuid) -> ServiceResult<()> {
        let assignee = Account::find_by_id(&self.db, assignee_id)
            .await?
            .ok_or_else(|| ServiceError::invalid(ASSIGNEE_NOT_FOUND))?;

        if assignee.tenant_id != Some(tenant_id) {
            return Err(ServiceError::invalid(
                "Assigned user does not belong to the same tenant",
            ));
        }

        Ok(())
    }

    /// Adds a task to a project; new tasks always start as `todo`
    pub async fn create(
        &self,
        caller: &Caller,
        project_id: Uuid,
        input: NewTask,
    ) -> ServiceResult<TaskView> {
        let project = self.load_project(project_id).await?;

        require(
            &caller.auth,
            Action::Create,
            &Resource::ProjectTasks {
                tenant_id: project.tenant_id,
            },
        )?;

        let title = required_text(&input.title, "Task title")?;
        if let Some(assignee_id) = input.assigned_to {
            self.check_assignee(project.tenant_id, assignee_id).await?;
        }

        let task = Task::create(
            &self.db,
            CreateTask {
                project_id,
                tenant_id: project.tenant_id,
                title,
                description: optional_text(input.description),
                status: TaskStatus::Todo,
                priority: input.priority.unwrap_or_default(),
                assigned_to: input.assigned_to,
                due_date: input.due_date,
            },
        )
        .await
        .map_err(assignee_write_error)?;

        tracing::info!(project_id = %project_id, task_id = %task.id, "Task created");

        self.audit.record(
            caller
                .audit(AuditAction::CreateTask)
                .tenant(project.tenant_id)
                .entity(EntityType::Task, task.id),
        );

        Ok(task.into())
    }

    /// Tasks of a project, by priority then due date
    pub async fn list(
        &self,
        ctx: &AuthContext,
        project_id: Uuid,
        query: TaskQuery,
        page: PageRequest,
    ) -> ServiceResult<Listing<TaskListItem>> {
        let project = self.load_project(project_id).await?;

        require(
            ctx,
            Action::List,
            &Resource::ProjectTasks {
                tenant_id: project.tenant_id,
            },
        )?;

        let filter = TaskFilter {
            project_id,
            status: query.status,
            priority: query.priority,
            assigned_to: query.assigned_to,
            search: query.search,
        };

        let page = Task::list(&self.db, &filter, page).await?;

        Ok(Listing::from_page(page, TaskListItem::from))
    }

    pub async fn update(
        &self,
        caller: &Caller,
        task_id: Uuid,
        changes: TaskChanges,
    ) -> ServiceResult<TaskView> {
        let task = self.load_task(task_id).await?;

        require(
            &caller.auth,
            Action::Update(FieldScope::Privileged),
            &Resource::Task {
                tenant_id: task.tenant_id,
            },
        )?;

        let update = UpdateTask {
            title: changes
                .title
                .as_deref()
                .map(|t| required_text(t, "Task title"))
                .transpose()?,
            description: changes.description.map(optional_text),
            status: changes.status,
            priority: changes.priority,
            assigned_to: changes.assigned_to,
            due_date: changes.due_date,
        };
        if update.is_empty() {
            return Err(ServiceError::invalid("No valid fields to update"));
        }

        if let Some(Some(assignee_id)) = update.assigned_to {
            self.check_assignee(task.tenant_id, assignee_id).await?;
        }

        let task = Task::update(&self.db, task_id, update)
            .await
            .map_err(assignee_write_error)?
            .ok_or_else(|| ServiceError::not_found("Task not found"))?;

        self.audit.record(
            caller
                .audit(AuditAction::UpdateTask)
                .tenant(task.tenant_id)
                .entity(EntityType::Task, task.id),
        );

        Ok(task.into())
    }

    /// Sets the status; repeating the same status is a no-op success
    pub async fn update_status(
        &self,
        caller: &Caller,
        task_id: Uuid,
        status: TaskStatus,
    ) -> ServiceResult<TaskView> {
        let task = self.load_task(task_id).await?;

        require(
            &caller.auth,
            Action::Update(FieldScope::Privileged),
            &Resource::Task {
                tenant_id: task.tenant_id,
            },
        )?;

        let task = Task::update(
            &self.db,
            task_id,
            UpdateTask {
                status: Some(status),
                ..Default::default()
            },
        )
        .await?
        .ok_or_else(|| ServiceError::not_found("Task not found"))?;

        self.audit.record(
            caller
                .audit(AuditAction::UpdateTaskStatus)
                .tenant(task.tenant_id)
                .entity(EntityType::Task, task.id),
        );

        Ok(task.into())
    }
}
