//! Project model and database operations
//!
//! Projects belong to one tenant and remember the account that created them.
//! When the creator is deleted `created_by` becomes NULL and only tenant
//! admins can manage the project from then on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::pagination::{like_pattern, FilterPredicate, Page, PageRequest};

const PROJECT_COLUMNS: &str =
    "id, tenant_id, name, description, status, created_by, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Active,
    Archived,
    Completed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Archived => "archived",
            ProjectStatus::Completed => "completed",
        }
    }
}

/// Project row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateProject {
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub created_by: Uuid,
}

/// Partial project update
///
/// `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<ProjectStatus>,
}

impl UpdateProject {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.status.is_none()
    }
}

/// Filter for project listings
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    /// `None` lists every tenant (platform view)
    pub tenant_id: Option<Uuid>,

    pub status: Option<ProjectStatus>,

    /// Case-insensitive substring match on name
    pub search: Option<String>,
}

impl FilterPredicate for ProjectFilter {
    fn push_predicates(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(tenant_id) = self.tenant_id {
            qb.push(" AND p.tenant_id = ").push_bind(tenant_id);
        }
        if let Some(status) = self.status {
            qb.push(" AND p.status = ").push_bind(status);
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = like_pattern(search.trim());
            qb.push(" AND p.name ILIKE ").push_bind(pattern);
        }
    }
}

/// Project row joined with its creator's name and task counters
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProjectSummary {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub created_by: Option<Uuid>,
    pub creator_name: Option<String>,
    pub task_count: i64,
    pub completed_task_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub async fn create<'e, E>(executor: E, data: CreateProject) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            "INSERT INTO projects (tenant_id, name, description, status, created_by) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {PROJECT_COLUMNS}"
        );

        sqlx::query_as::<_, Project>(&sql)
            .bind(data.tenant_id)
            .bind(data.name)
            .bind(data.description)
            .bind(data.status)
            .bind(data.created_by)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");

        sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Number of projects a tenant currently owns
    pub async fn count_in_tenant<'e, E>(executor: E, tenant_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM projects WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_one(executor)
            .await
    }

    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE projects SET updated_at = NOW()");

        if let Some(name) = data.name {
            qb.push(", name = ").push_bind(name);
        }
        if let Some(description) = data.description {
            qb.push(", description = ").push_bind(description);
        }
        if let Some(status) = data.status {
            qb.push(", status = ").push_bind(status);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" RETURNING ").push(PROJECT_COLUMNS);

        qb.build_query_as::<Project>().fetch_optional(executor).await
    }

    /// Deletes a project; its tasks go with it by cascade
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists projects with creator and task counters, newest first
    pub async fn list(
        pool: &PgPool,
        filter: &ProjectFilter,
        page: PageRequest,
    ) -> Result<Page<ProjectSummary>, sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM projects p WHERE 1=1");
        filter.push_predicates(&mut count);
        let (total,) = count.build_query_as::<(i64,)>().fetch_one(pool).await?;

        let mut list = QueryBuilder::<Postgres>::new(
            r#"
            SELECT p.id, p.tenant_id, p.name, p.description, p.status, p.created_by,
                   u.full_name AS creator_name,
                   (SELECT COUNT(*) FROM tasks t WHERE t.project_id = p.id) AS task_count,
                   (SELECT COUNT(*) FROM tasks t
                     WHERE t.project_id = p.id AND t.status = 'completed') AS completed_task_count,
                   p.created_at, p.updated_at
            FROM projects p
            LEFT JOIN users u ON u.id = p.created_by
            WHERE 1=1
            "#,
        );
        filter.push_predicates(&mut list);
        list.push(" ORDER BY p.created_at DESC");
        page.push_limit_offset(&mut list);

        let items = list.build_query_as::<ProjectSummary>().fetch_all(pool).await?;

        Ok(Page {
            items,
            total,
            request: page,
        })
    }
}
