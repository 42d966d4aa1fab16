//! Account model and database operations
//!
//! Accounts live in the `users` table. A `super_admin` account is
//! platform-level and has no tenant; every other role belongs to exactly one
//! tenant. The schema enforces this with a CHECK constraint.
//!
//! Emails are stored lowercased and are unique per tenant (and unique among
//! platform accounts).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::pagination::{like_pattern, FilterPredicate, Page, PageRequest};

const ACCOUNT_COLUMNS: &str = "id, tenant_id, email, password_hash, full_name, role, \
                               is_active, created_at, updated_at";

/// Account role
///
/// Ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular tenant member
    User,

    /// Administers a single tenant
    TenantAdmin,

    /// Platform operator, not bound to any tenant
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::TenantAdmin => "tenant_admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    /// Whether accounts with this role must carry a tenant id
    pub fn is_tenant_scoped(&self) -> bool {
        !matches!(self, Role::SuperAdmin)
    }
}

/// Account row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,

    /// `None` only for super_admin
    pub tenant_id: Option<Uuid>,

    pub email: String,

    /// Argon2id PHC string; never serialized
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an account
#[derive(Debug, Clone)]
pub struct CreateAccount {
    pub tenant_id: Option<Uuid>,

    /// Must already be lowercased
    pub email: String,

    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
}

/// Partial account update
#[derive(Debug, Clone, Default)]
pub struct UpdateAccount {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UpdateAccount {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.role.is_none() && self.is_active.is_none()
    }
}

/// Filter for account listings
#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    /// Restrict to one tenant; `None` lists across the platform
    pub tenant_id: Option<Uuid>,

    pub role: Option<Role>,
    pub is_active: Option<bool>,

    /// Substring match on email or full name
    pub search: Option<String>,
}

impl FilterPredicate for AccountFilter {
    fn push_predicates(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(tenant_id) = self.tenant_id {
            qb.push(" AND u.tenant_id = ").push_bind(tenant_id);
        }
        if let Some(role) = self.role {
            qb.push(" AND u.role = ").push_bind(role);
        }
        if let Some(is_active) = self.is_active {
            qb.push(" AND u.is_active = ").push_bind(is_active);
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = like_pattern(search.trim());
            qb.push(" AND (u.email ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR u.full_name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

impl Account {
    /// Inserts an account
    ///
    /// # Errors
    ///
    /// Fails with a unique violation if the email already exists in the tenant.
    pub async fn create<'e, E>(executor: E, data: CreateAccount) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            "INSERT INTO users (tenant_id, email, password_hash, full_name, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {ACCOUNT_COLUMNS}"
        );

        sqlx::query_as::<_, Account>(&sql)
            .bind(data.tenant_id)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(data.full_name)
            .bind(data.role)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Looks up an account by email inside one tenant
    pub async fn find_in_tenant_by_email<'e, E>(
        executor: E,
        tenant_id: Uuid,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE tenant_id = $1 AND LOWER(email) = LOWER($2)"
        );

        sqlx::query_as::<_, Account>(&sql)
            .bind(tenant_id)
            .bind(email)
            .fetch_optional(executor)
            .await
    }

    /// Looks up a platform-level (tenantless) account by email
    pub async fn find_platform_by_email<'e, E>(
        executor: E,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE tenant_id IS NULL AND LOWER(email) = LOWER($1)"
        );

        sqlx::query_as::<_, Account>(&sql)
            .bind(email)
            .fetch_optional(executor)
            .await
    }

    /// Whether any tenant already has an account with this email
    pub async fn email_exists_in_any_tenant<'e, E>(
        executor: E,
        email: &str,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE tenant_id IS NOT NULL AND LOWER(email) = LOWER($1))",
        )
        .bind(email)
        .fetch_one(executor)
        .await
    }

    /// Number of active accounts in a tenant
    pub async fn count_active_in_tenant<'e, E>(
        executor: E,
        tenant_id: Uuid,
    ) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE tenant_id = $1 AND is_active = TRUE",
        )
        .bind(tenant_id)
        .fetch_one(executor)
        .await
    }

    /// Applies a partial update
    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: UpdateAccount,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE users SET updated_at = NOW()");

        if let Some(full_name) = data.full_name {
            qb.push(", full_name = ").push_bind(full_name);
        }
        if let Some(role) = data.role {
            qb.push(", role = ").push_bind(role);
        }
        if let Some(is_active) = data.is_active {
            qb.push(", is_active = ").push_bind(is_active);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" RETURNING ").push(ACCOUNT_COLUMNS);

        qb.build_query_as::<Account>().fetch_optional(executor).await
    }

    /// Deletes an account
    ///
    /// Task assignments are cleared by `ON DELETE SET NULL`; callers that need
    /// the unassignment to be explicit run [`crate::models::task::Task::unassign_all`]
    /// in the same transaction first.
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists accounts, newest first
    pub async fn list(
        pool: &PgPool,
        filter: &AccountFilter,
        page: PageRequest,
    ) -> Result<Page<Self>, sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users u WHERE 1=1");
        filter.push_predicates(&mut count);
        let (total,) = count.build_query_as::<(i64,)>().fetch_one(pool).await?;

        let mut list = QueryBuilder::<Postgres>::new(
            "SELECT u.id, u.tenant_id, u.email, u.password_hash, u.full_name, u.role, \
             u.is_active, u.created_at, u.updated_at FROM users u WHERE 1=1",
        );
        filter.push_predicates(&mut list);
        list.push(" ORDER BY u.created_at DESC");
        page.push_limit_offset(&mut list);

        let items = list.build_query_as::<Account>().fetch_all(pool).await?;

        Ok(Page {
            items,
            total,
            request: page,
        })
    }
}
