//! Project management

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::{optional_text, required_text, Caller, Listing, ServiceResult};
use crate::audit::{AuditAction, AuditRecorder, EntityType};
use crate::auth::authorization::{require, Action, FieldScope, Resource};
use crate::auth::verifier::AuthContext;
use crate::error::ServiceError;
use crate::models::pagination::PageRequest;
use crate::models::project::{
    CreateProject, Project, ProjectFilter, ProjectStatus, ProjectSummary, UpdateProject,
};
use crate::quota::{QuotaGuard, QuotaType};

/// Default page size for project listings
pub const DEFAULT_PROJECT_PAGE: i64 = 20;

#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    pub name: Option<String>,

    /// `Some(None)` clears the description
    pub description: Option<Option<String>>,

    pub status: Option<ProjectStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectQuery {
    pub status: Option<ProjectStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Project> for ProjectView {
    fn from(p: Project) -> Self {
        Self {
            id: p.id,
            tenant_id: p.tenant_id,
            name: p.name,
            description: p.description,
            status: p.status,
            created_by: p.created_by,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Creator {
    pub id: Uuid,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListItem {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub creator: Option<Creator>,
    pub task_count: i64,
    pub completed_task_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProjectSummary> for ProjectListItem {
    fn from(p: ProjectSummary) -> Self {
        let creator = match (p.created_by, p.creator_name) {
            (Some(id), Some(full_name)) => Some(Creator { id, full_name }),
            _ => None,
        };

        Self {
            id: p.id,
            tenant_id: p.tenant_id,
            name: p.name,
            description: p.description,
            status: p.status,
            creator,
            task_count: p.task_count,
            completed_task_count: p.completed_task_count,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct ProjectService {
    db: PgPool,
    audit: AuditRecorder,
}

impl ProjectService {
    pub fn new(db: PgPool, audit: AuditRecorder) -> Self {
        Self { db, audit }
    }

    async fn load(&self, project_id: Uuid) -> ServiceResult<Project> {
        Project::find_by_id(&self.db, project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project not found"))
    }

    /// Creates a project in the caller's tenant
    ///
    /// # Errors
    ///
    /// - `AccessDenied` for a super_admin (no tenant to create in)
    /// - `LimitExceeded` once the tenant holds `max_projects` projects
    pub async fn create(&self, caller: &Caller, input: NewProject) -> ServiceResult<ProjectView> {
        require(&caller.auth, Action::Create, &Resource::ProjectCatalog)?;

        let tenant_id = caller
            .auth
            .tenant_id
            .ok_or_else(|| ServiceError::denied("Super admin cannot create projects"))?;

        let name = required_text(&input.name, "Project name")?;

        let mut tx = self.db.begin().await?;

        QuotaGuard::reserve(&mut tx, tenant_id, QuotaType::Projects).await?;

        let project = Project::create(
            &mut *tx,
            CreateProject {
                tenant_id,
                name,
                description: optional_text(input.description),
                status: input.status.unwrap_or_default(),
                created_by: caller.auth.account_id,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(tenant_id = %tenant_id, project_id = %project.id, "Project created");

        self.audit.record(
            caller
                .audit(AuditAction::CreateProject)
                .entity(EntityType::Project, project.id),
        );

        Ok(project.into())
    }

    /// Projects visible to the caller, newest first
    ///
    /// Tenant members only ever see their own tenant; a super_admin sees all.
    pub async fn list(
        &self,
        ctx: &AuthContext,
        query: ProjectQuery,
        page: PageRequest,
    ) -> ServiceResult<Listing<ProjectListItem>> {
        require(ctx, Action::List, &Resource::ProjectCatalog)?;

        let tenant_id = if ctx.is_super_admin() {
            None
        } else {
            Some(
                ctx.tenant_id
                    .ok_or_else(|| ServiceError::denied("Invalid authentication context"))?,
            )
        };

        let filter = ProjectFilter {
            tenant_id,
            status: query.status,
            search: query.search,
        };

        let page = Project::list(&self.db, &filter, page).await?;

        Ok(Listing::from_page(page, ProjectListItem::from))
    }

    pub async fn update(
        &self,
        caller: &Caller,
        project_id: Uuid,
        changes: ProjectChanges,
    ) -> ServiceResult<ProjectView> {
        let project = self.load(project_id).await?;

        require(
            &caller.auth,
            Action::Update(FieldScope::Privileged),
            &Resource::Project {
                tenant_id: project.tenant_id,
                created_by: project.created_by,
            },
        )?;

        let update = UpdateProject {
            name: changes
                .name
                .as_deref()
                .map(|n| required_text(n, "Project name"))
                .transpose()?,
            description: changes.description.map(optional_text),
            status: changes.status,
        };
        if update.is_empty() {
            return Err(ServiceError::invalid("No valid fields to update"));
        }

        let project = Project::update(&self.db, project_id, update)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project not found"))?;

        self.audit.record(
            caller
                .audit(AuditAction::UpdateProject)
                .tenant(project.tenant_id)
                .entity(EntityType::Project, project.id),
        );

        Ok(project.into())
    }

    /// Deletes a project and its tasks
    pub async fn delete(&self, caller: &Caller, project_id: Uuid) -> ServiceResult<()> {
        let project = self.load(project_id).await?;

        require(
            &caller.auth,
            Action::Delete,
            &Resource::Project {
                tenant_id: project.tenant_id,
                created_by: project.created_by,
            },
        )?;

        if !Project::delete(&self.db, project_id).await? {
            return Err(ServiceError::not_found("Project not found"));
        }

        tracing::info!(project_id = %project_id, "Project deleted");

        self.audit.record(
            caller
                .audit(AuditAction::DeleteProject)
                .tenant(project.tenant_id)
                .entity(EntityType::Project, project_id),
        );

        Ok(())
    }
}
