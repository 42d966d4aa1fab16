//! Tenant registration and administration

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::{normalize_email, required_text, Caller, Listing, ServiceResult};
use crate::audit::{AuditAction, AuditEntry, AuditRecorder, EntityType};
use crate::auth::authorization::{require, Action, FieldScope, Resource};
use crate::auth::password::{hash_password, validate_password};
use crate::auth::verifier::AuthContext;
use crate::error::{is_unique_violation, ServiceError};
use crate::models::account::{Account, CreateAccount, Role};
use crate::models::pagination::PageRequest;
use crate::models::tenant::{
    normalize_subdomain, CreateTenant, SubscriptionPlan, Tenant, TenantFilter, TenantStats,
    TenantStatus, TenantSummary, UpdateTenant,
};
use crate::quota::PlanLimits;

/// Default page size for the tenant directory
pub const DEFAULT_TENANT_PAGE: i64 = 10;

/// Self-service signup: a new tenant and its first admin
#[derive(Debug, Clone)]
pub struct RegisterTenant {
    pub tenant_name: String,
    pub subdomain: String,
    pub admin_email: String,
    pub admin_password: String,
    pub admin_full_name: String,
}

/// Requested tenant changes
#[derive(Debug, Clone, Default)]
pub struct TenantChanges {
    pub name: Option<String>,
    pub status: Option<TenantStatus>,
    pub subscription_plan: Option<SubscriptionPlan>,
    pub max_users: Option<i32>,
    pub max_projects: Option<i32>,
}

impl TenantChanges {
    /// Anything beyond the name needs platform rights
    pub fn scope(&self) -> FieldScope {
        if self.status.is_some()
            || self.subscription_plan.is_some()
            || self.max_users.is_some()
            || self.max_projects.is_some()
        {
            FieldScope::Privileged
        } else {
            FieldScope::NameOnly
        }
    }

    /// Resolves the row update; a plan change without explicit ceilings
    /// takes the plan's defaults
    fn into_update(self) -> ServiceResult<UpdateTenant> {
        let name = self
            .name
            .as_deref()
            .map(|n| required_text(n, "Tenant name"))
            .transpose()?;

        for (value, field) in [(self.max_users, "maxUsers"), (self.max_projects, "maxProjects")] {
            if value.is_some_and(|v| v < 0) {
                return Err(ServiceError::invalid(format!("{} cannot be negative", field)));
            }
        }

        let defaults = self.subscription_plan.map(PlanLimits::for_plan);

        Ok(UpdateTenant {
            name,
            status: self.status,
            subscription_plan: self.subscription_plan,
            max_users: self.max_users.or(defaults.map(|d| d.max_users)),
            max_projects: self.max_projects.or(defaults.map(|d| d.max_projects)),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserView {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationView {
    pub tenant_id: Uuid,
    pub subdomain: String,
    pub admin_user: AdminUserView,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantView {
    pub id: Uuid,
    pub name: String,
    pub subdomain: String,
    pub status: TenantStatus,
    pub subscription_plan: SubscriptionPlan,
    pub max_users: i32,
    pub max_projects: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Tenant> for TenantView {
    fn from(t: Tenant) -> Self {
        Self {
            id: t.id,
            name: t.name,
            subdomain: t.subdomain,
            status: t.status,
            subscription_plan: t.subscription_plan,
            max_users: t.max_users,
            max_projects: t.max_projects,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

/// Tenant plus usage counters
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantDetailsView {
    #[serde(flatten)]
    pub tenant: TenantView,
    pub stats: TenantStats,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantListItem {
    pub id: Uuid,
    pub name: String,
    pub subdomain: String,
    pub status: TenantStatus,
    pub subscription_plan: SubscriptionPlan,
    pub max_users: i32,
    pub max_projects: i32,
    pub total_users: i64,
    pub total_projects: i64,
    pub created_at: DateTime<Utc>,
}

impl From<TenantSummary> for TenantListItem {
    fn from(t: TenantSummary) -> Self {
        Self {
            id: t.id,
            name: t.name,
            subdomain: t.subdomain,
            status: t.status,
            subscription_plan: t.subscription_plan,
            max_users: t.max_users,
            max_projects: t.max_projects,
            total_users: t.user_count,
            total_projects: t.project_count,
            created_at: t.created_at,
        }
    }
}

#[derive(Clone)]
pub struct TenantService {
    db: PgPool,
    audit: AuditRecorder,
}

impl TenantService {
    pub fn new(db: PgPool, audit: AuditRecorder) -> Self {
        Self { db, audit }
    }

    /// Creates a tenant on the free plan together with its tenant_admin
    ///
    /// Both rows are written in one transaction; neither exists without the
    /// other.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a bad subdomain, email, name or short password
    /// - `Conflict` if the subdomain (case-insensitively) or the admin email
    ///   is already taken
    pub async fn register(
        &self,
        input: RegisterTenant,
        ip_address: Option<String>,
    ) -> ServiceResult<RegistrationView> {
        let tenant_name = required_text(&input.tenant_name, "Tenant name")?;
        let subdomain =
            normalize_subdomain(&input.subdomain).map_err(|e| ServiceError::invalid(e.to_string()))?;
        let admin_email = normalize_email(&input.admin_email)?;
        let admin_full_name = required_text(&input.admin_full_name, "Full name")?;
        validate_password(&input.admin_password).map_err(ServiceError::InvalidInput)?;

        let password_hash = hash_password(&input.admin_password)?;
        let limits = PlanLimits::for_plan(SubscriptionPlan::Free);

        let mut tx = self.db.begin().await?;

        if Tenant::subdomain_exists(&mut *tx, &subdomain).await? {
            return Err(ServiceError::conflict("Subdomain already exists"));
        }
        if Account::email_exists_in_any_tenant(&mut *tx, &admin_email).await? {
            return Err(ServiceError::conflict("Email already exists"));
        }

        let tenant = Tenant::create(
            &mut *tx,
            CreateTenant {
                name: tenant_name,
                subdomain,
                status: TenantStatus::Active,
                subscription_plan: SubscriptionPlan::Free,
                max_users: limits.max_users,
                max_projects: limits.max_projects,
            },
        )
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::conflict("Subdomain already exists")
            } else {
                ServiceError::from(e)
            }
        })?;

        let admin = Account::create(
            &mut *tx,
            CreateAccount {
                tenant_id: Some(tenant.id),
                email: admin_email,
                password_hash,
                full_name: admin_full_name,
                role: Role::TenantAdmin,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            tenant_id = %tenant.id,
            subdomain = %tenant.subdomain,
            admin_id = %admin.id,
            "Tenant registered"
        );

        self.audit.record(
            AuditEntry::new(AuditAction::CreateTenant, Some(tenant.id), admin.id)
                .entity(EntityType::Tenant, tenant.id)
                .ip(ip_address),
        );

        Ok(RegistrationView {
            tenant_id: tenant.id,
            subdomain: tenant.subdomain,
            admin_user: AdminUserView {
                id: admin.id,
                email: admin.email,
                full_name: admin.full_name,
                role: admin.role,
            },
        })
    }

    /// Tenant with usage counters
    pub async fn get(&self, ctx: &AuthContext, tenant_id: Uuid) -> ServiceResult<TenantDetailsView> {
        require(ctx, Action::View, &Resource::Tenant { tenant_id })?;

        let tenant = Tenant::find_by_id(&self.db, tenant_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Tenant not found"))?;
        let stats = Tenant::stats(&self.db, tenant_id).await?;

        Ok(TenantDetailsView {
            tenant: tenant.into(),
            stats,
        })
    }

    /// Applies tenant changes
    ///
    /// A tenant_admin may rename its own tenant; status, plan and ceilings
    /// are super_admin only.
    pub async fn update(
        &self,
        caller: &Caller,
        tenant_id: Uuid,
        changes: TenantChanges,
    ) -> ServiceResult<TenantView> {
        require(
            &caller.auth,
            Action::Update(changes.scope()),
            &Resource::Tenant { tenant_id },
        )?;

        if Tenant::find_by_id(&self.db, tenant_id).await?.is_none() {
            return Err(ServiceError::not_found("Tenant not found"));
        }

        let update = changes.into_update()?;
        if update.is_empty() {
            return Err(ServiceError::invalid("No valid fields to update"));
        }

        let tenant = Tenant::update(&self.db, tenant_id, update)
            .await?
            .ok_or_else(|| ServiceError::not_found("Tenant not found"))?;

        tracing::info!(tenant_id = %tenant.id, "Tenant updated");

        self.audit.record(
            caller
                .audit(AuditAction::UpdateTenant)
                .tenant(tenant.id)
                .entity(EntityType::Tenant, tenant.id),
        );

        Ok(tenant.into())
    }

    /// Platform tenant directory, newest first
    pub async fn list(
        &self,
        ctx: &AuthContext,
        filter: TenantFilter,
        page: PageRequest,
    ) -> ServiceResult<Listing<TenantListItem>> {
        require(ctx, Action::List, &Resource::TenantDirectory)?;

        let page = Tenant::list(&self.db, &filter, page).await?;

        Ok(Listing::from_page(page, TenantListItem::from))
    }
}
