//! Task model and database operations
//!
//! Tasks belong to a project and carry a denormalized `tenant_id` so tenant
//! scoping never needs a join. The assignee, if any, must be an account of the
//! same tenant; that rule is checked by the task service before writing.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::pagination::{like_pattern, FilterPredicate, Page, PageRequest};

const TASK_COLUMNS: &str = "id, project_id, tenant_id, title, description, status, priority, \
                            assigned_to, due_date, created_at, updated_at";

/// Task workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

/// Task row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
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

#[derive(Debug, Clone)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub tenant_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
}

/// Partial task update
///
/// The nullable columns use `Option<Option<_>>`: `Some(None)` clears the value.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Option<Uuid>>,
    pub due_date: Option<Option<NaiveDate>>,
}

impl UpdateTask {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.assigned_to.is_none()
            && self.due_date.is_none()
    }
}

/// Filter for the tasks of one project
#[derive(Debug, Clone)]
pub struct TaskFilter {
    pub project_id: Uuid,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Uuid>,

    /// Case-insensitive substring match on title
    pub search: Option<String>,
}

impl TaskFilter {
    pub fn for_project(project_id: Uuid) -> Self {
        Self {
            project_id,
            status: None,
            priority: None,
            assigned_to: None,
            search: None,
        }
    }
}

impl FilterPredicate for TaskFilter {
    fn push_predicates(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" AND t.project_id = ").push_bind(self.project_id);

        if let Some(status) = self.status {
            qb.push(" AND t.status = ").push_bind(status);
        }
        if let Some(priority) = self.priority {
            qb.push(" AND t.priority = ").push_bind(priority);
        }
        if let Some(assigned_to) = self.assigned_to {
            qb.push(" AND t.assigned_to = ").push_bind(assigned_to);
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = like_pattern(search.trim());
            qb.push(" AND t.title ILIKE ").push_bind(pattern);
        }
    }
}

/// Task row joined with the assignee's name and email
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskSummary {
    pub id: Uuid,
    pub project_id: Uuid,
    pub tenant_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: Option<Uuid>,
    pub assignee_name: Option<String>,
    pub assignee_email: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub async fn create<'e, E>(executor: E, data: CreateTask) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            "INSERT INTO tasks (project_id, tenant_id, title, description, status, priority, \
             assigned_to, due_date) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {TASK_COLUMNS}"
        );

        sqlx::query_as::<_, Task>(&sql)
            .bind(data.project_id)
            .bind(data.tenant_id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.status)
            .bind(data.priority)
            .bind(data.assigned_to)
            .bind(data.due_date)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");

        sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE tasks SET updated_at = NOW()");

        if let Some(title) = data.title {
            qb.push(", title = ").push_bind(title);
        }
        if let Some(description) = data.description {
            qb.push(", description = ").push_bind(description);
        }
        if let Some(status) = data.status {
            qb.push(", status = ").push_bind(status);
        }
        if let Some(priority) = data.priority {
            qb.push(", priority = ").push_bind(priority);
        }
        if let Some(assigned_to) = data.assigned_to {
            qb.push(", assigned_to = ").push_bind(assigned_to);
        }
        if let Some(due_date) = data.due_date {
            qb.push(", due_date = ").push_bind(due_date);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" RETURNING ").push(TASK_COLUMNS);

        qb.build_query_as::<Task>().fetch_optional(executor).await
    }

    /// Clears `assigned_to` on every task assigned to an account
    ///
    /// Returns the number of tasks touched.
    pub async fn unassign_all<'e, E>(executor: E, account_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE tasks SET assigned_to = NULL, updated_at = NOW() WHERE assigned_to = $1",
        )
        .bind(account_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Lists the tasks of a project
    ///
    /// Ordered by priority (high first), then due date with undated tasks last.
    pub async fn list(
        pool: &PgPool,
        filter: &TaskFilter,
        page: PageRequest,
    ) -> Result<Page<TaskSummary>, sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks t WHERE 1=1");
        filter.push_predicates(&mut count);
        let (total,) = count.build_query_as::<(i64,)>().fetch_one(pool).await?;

        let mut list = QueryBuilder::<Postgres>::new(
            r#"
            SELECT t.id, t.project_id, t.tenant_id, t.title, t.description, t.status,
                   t.priority, t.assigned_to, u.full_name AS assignee_name,
                   u.email AS assignee_email, t.due_date, t.created_at, t.updated_at
            FROM tasks t
            LEFT JOIN users u ON u.id = t.assigned_to
            WHERE 1=1
            "#,
        );
        filter.push_predicates(&mut list);
        list.push(
            " ORDER BY CASE t.priority WHEN 'high' THEN 1 WHEN 'medium' THEN 2 ELSE 3 END, \
             t.due_date ASC NULLS LAST, t.created_at DESC",
        );
        page.push_limit_offset(&mut list);

        let items = list.build_query_as::<TaskSummary>().fetch_all(pool).await?;

        Ok(Page {
            items,
            total,
            request: page,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_enum_defaults() {
        assert_eq!(TaskStatus::default(), TaskStatus::Todo);
        assert_eq!(TaskPriority::default(), TaskPriority::Medium);
    }

    #[test]
    fn test_task_enum_serde() {
        let status: TaskStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(status, TaskStatus::InProgress);
        assert_eq!(status.as_str(), "in_progress");

        assert!(serde_json::from_str::<TaskStatus>("\"done\"").is_err());
        assert!(serde_json::from_str::<TaskPriority>("\"urgent\"").is_err());
    }

    #[test]
    fn test_update_task_clearing_assignee_counts_as_change() {
        let update = UpdateTask {
            assigned_to: Some(None),
            ..Default::default()
        };
        assert!(!update.is_empty());
        assert!(UpdateTask::default().is_empty());
    }

    #[test]
    fn test_task_filter_always_scopes_to_project() {
        let filter = TaskFilter {
            status: Some(TaskStatus::Completed),
            ..TaskFilter::for_project(Uuid::new_v4())
        };

        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks t WHERE 1=1");
        filter.push_predicates(&mut qb);

        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM tasks t WHERE 1=1 AND t.project_id = $1 AND t.status = $2"
        );
    }
}
