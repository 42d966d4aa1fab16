//! Tenant model and database operations
//!
//! A tenant is an organization. Every non-platform account, project and task
//! belongs to exactly one tenant, and the tenant row carries the subscription
//! ceilings enforced by [`crate::quota`].
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE tenants (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     name VARCHAR(255) NOT NULL,
//!     subdomain VARCHAR(63) NOT NULL,
//!     status tenant_status NOT NULL DEFAULT 'active',
//!     subscription_plan subscription_plan NOT NULL DEFAULT 'free',
//!     max_users INTEGER NOT NULL DEFAULT 5,
//!     max_projects INTEGER NOT NULL DEFAULT 3,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::pagination::{FilterPredicate, Page, PageRequest};

/// Minimum subdomain length after normalization
pub const SUBDOMAIN_MIN_LEN: usize = 3;

/// Maximum subdomain length (one DNS label)
pub const SUBDOMAIN_MAX_LEN: usize = 63;

const TENANT_COLUMNS: &str = "id, name, subdomain, status, subscription_plan, max_users, \
                              max_projects, created_at, updated_at";

/// Tenant lifecycle status
///
/// Login is only allowed while the tenant is `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tenant_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Active,
    Suspended,
    Trial,
}

impl TenantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Active => "active",
            TenantStatus::Suspended => "suspended",
            TenantStatus::Trial => "trial",
        }
    }
}

/// Subscription plan
///
/// The plan determines the default `max_users` / `max_projects` ceilings,
/// see [`crate::quota::PlanLimits::for_plan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_plan", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
    Free,
    Pro,
    Enterprise,
}

impl SubscriptionPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Free => "free",
            SubscriptionPlan::Pro => "pro",
            SubscriptionPlan::Enterprise => "enterprise",
        }
    }
}

/// Subdomain rejected by [`normalize_subdomain`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubdomainError {
    #[error("Subdomain must be between 3 and 63 characters")]
    Length,

    #[error("Subdomain may only contain lowercase letters, digits and hyphens, and must start and end with a letter or digit")]
    Format,
}

/// Trims and lowercases a subdomain, then checks it is a valid DNS label
///
/// # Example
///
/// ```
/// use workboard_shared::models::tenant::normalize_subdomain;
///
/// assert_eq!(normalize_subdomain("  Acme-Corp ").unwrap(), "acme-corp");
/// assert!(normalize_subdomain("ab").is_err());
/// assert!(normalize_subdomain("-acme").is_err());
/// ```
pub fn normalize_subdomain(raw: &str) -> Result<String, SubdomainError> {
    let subdomain = raw.trim().to_ascii_lowercase();

    if subdomain.len() < SUBDOMAIN_MIN_LEN || subdomain.len() > SUBDOMAIN_MAX_LEN {
        return Err(SubdomainError::Length);
    }

    let bytes = subdomain.as_bytes();
    let is_label_char = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-';
    let is_edge_char = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit();

    if !bytes.iter().all(is_label_char)
        || !bytes.first().is_some_and(is_edge_char)
        || !bytes.last().is_some_and(is_edge_char)
    {
        return Err(SubdomainError::Format);
    }

    Ok(subdomain)
}

/// Tenant row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,

    /// Lowercase, unique across the platform
    pub subdomain: String,

    pub status: TenantStatus,
    pub subscription_plan: SubscriptionPlan,

    /// Ceiling on active accounts
    pub max_users: i32,

    /// Ceiling on projects
    pub max_projects: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a tenant
#[derive(Debug, Clone)]
pub struct CreateTenant {
    pub name: String,

    /// Must already be normalized
    pub subdomain: String,

    pub status: TenantStatus,
    pub subscription_plan: SubscriptionPlan,
    pub max_users: i32,
    pub max_projects: i32,
}

/// Partial tenant update; `None` fields are left unchanged
#[derive(Debug, Clone, Default)]
pub struct UpdateTenant {
    pub name: Option<String>,
    pub status: Option<TenantStatus>,
    pub subscription_plan: Option<SubscriptionPlan>,
    pub max_users: Option<i32>,
    pub max_projects: Option<i32>,
}

impl UpdateTenant {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.status.is_none()
            && self.subscription_plan.is_none()
            && self.max_users.is_none()
            && self.max_projects.is_none()
    }
}

/// Filter for the platform tenant directory
#[derive(Debug, Clone, Default)]
pub struct TenantFilter {
    pub status: Option<TenantStatus>,
    pub subscription_plan: Option<SubscriptionPlan>,
}

impl FilterPredicate for TenantFilter {
    fn push_predicates(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(status) = self.status {
            qb.push(" AND t.status = ").push_bind(status);
        }
        if let Some(plan) = self.subscription_plan {
            qb.push(" AND t.subscription_plan = ").push_bind(plan);
        }
    }
}

/// Tenant row with membership counts, used by the platform directory
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TenantSummary {
    pub id: Uuid,
    pub name: String,
    pub subdomain: String,
    pub status: TenantStatus,
    pub subscription_plan: SubscriptionPlan,
    pub max_users: i32,
    pub max_projects: i32,
    pub user_count: i64,
    pub project_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Per-tenant usage counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TenantStats {
    pub total_users: i64,
    pub active_users: i64,
    pub total_projects: i64,
    pub total_tasks: i64,
}

impl Tenant {
    /// Inserts a tenant
    ///
    /// # Errors
    ///
    /// Fails with a unique violation if the subdomain is taken.
    pub async fn create<'e, E>(executor: E, data: CreateTenant) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            "INSERT INTO tenants (name, subdomain, status, subscription_plan, max_users, max_projects) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {TENANT_COLUMNS}"
        );

        sqlx::query_as::<_, Tenant>(&sql)
            .bind(data.name)
            .bind(data.subdomain)
            .bind(data.status)
            .bind(data.subscription_plan)
            .bind(data.max_users)
            .bind(data.max_projects)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE id = $1");

        sqlx::query_as::<_, Tenant>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Looks up a tenant by subdomain, ignoring case
    pub async fn find_by_subdomain<'e, E>(
        executor: E,
        subdomain: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE LOWER(subdomain) = LOWER($1)");

        sqlx::query_as::<_, Tenant>(&sql)
            .bind(subdomain)
            .fetch_optional(executor)
            .await
    }

    /// Loads a tenant and takes a row lock until the surrounding transaction ends
    ///
    /// Concurrent quota checks against the same tenant serialize on this lock.
    pub async fn lock_for_update<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE id = $1 FOR UPDATE");

        sqlx::query_as::<_, Tenant>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Case-insensitive subdomain existence check
    pub async fn subdomain_exists<'e, E>(executor: E, subdomain: &str) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM tenants WHERE LOWER(subdomain) = LOWER($1))",
        )
        .bind(subdomain)
        .fetch_one(executor)
        .await
    }

    /// Applies a partial update
    ///
    /// Returns `None` if the tenant doesn't exist. An empty update only
    /// touches `updated_at`.
    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: UpdateTenant,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE tenants SET updated_at = NOW()");

        if let Some(name) = data.name {
            qb.push(", name = ").push_bind(name);
        }
        if let Some(status) = data.status {
            qb.push(", status = ").push_bind(status);
        }
        if let Some(plan) = data.subscription_plan {
            qb.push(", subscription_plan = ").push_bind(plan);
        }
        if let Some(max_users) = data.max_users {
            qb.push(", max_users = ").push_bind(max_users);
        }
        if let Some(max_projects) = data.max_projects {
            qb.push(", max_projects = ").push_bind(max_projects);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" RETURNING ").push(TENANT_COLUMNS);

        qb.build_query_as::<Tenant>().fetch_optional(executor).await
    }

    /// Usage counters for one tenant
    pub async fn stats(pool: &PgPool, id: Uuid) -> Result<TenantStats, sqlx::Error> {
        sqlx::query_as::<_, TenantStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users WHERE tenant_id = $1) AS total_users,
                (SELECT COUNT(*) FROM users WHERE tenant_id = $1 AND is_active) AS active_users,
                (SELECT COUNT(*) FROM projects WHERE tenant_id = $1) AS total_projects,
                (SELECT COUNT(*) FROM tasks WHERE tenant_id = $1) AS total_tasks
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Lists tenants, newest first
    pub async fn list(
        pool: &PgPool,
        filter: &TenantFilter,
        page: PageRequest,
    ) -> Result<Page<TenantSummary>, sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tenants t WHERE 1=1");
        filter.push_predicates(&mut count);
        let (total,) = count.build_query_as::<(i64,)>().fetch_one(pool).await?;

        let mut list = QueryBuilder::<Postgres>::new(
            r#"
            SELECT t.id, t.name, t.subdomain, t.status, t.subscription_plan,
                   t.max_users, t.max_projects, t.created_at,
                   (SELECT COUNT(*) FROM users u WHERE u.tenant_id = t.id) AS user_count,
                   (SELECT COUNT(*) FROM projects p WHERE p.tenant_id = t.id) AS project_count
            FROM tenants t
            WHERE 1=1
            "#,
        );
        filter.push_predicates(&mut list);
        list.push(" ORDER BY t.created_at DESC");
        page.push_limit_offset(&mut list);

        let items = list.build_query_as::<TenantSummary>().fetch_all(pool).await?;

        Ok(Page {
            items,
            total,
            request: page,
        })
    }
}
