//! Tenant member management

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::{normalize_email, required_text, Caller, Listing, ServiceResult};
use crate::audit::{AuditAction, AuditRecorder, EntityType};
use crate::auth::authorization::{require, Action, FieldScope, Resource};
use crate::auth::password::{hash_password, validate_password};
use crate::auth::verifier::AuthContext;
use crate::error::{is_unique_violation, ServiceError};
use crate::models::account::{Account, AccountFilter, CreateAccount, Role, UpdateAccount};
use crate::models::pagination::PageRequest;
use crate::models::task::Task;
use crate::quota::{QuotaGuard, QuotaType};

/// Default page size for member listings
pub const DEFAULT_ACCOUNT_PAGE: i64 = 50;

const DUPLICATE_EMAIL: &str = "Email already exists in this tenant";

#[derive(Debug, Clone)]
pub struct NewMember {
    pub email: String,
    pub password: String,
    pub full_name: String,

    /// `user` or `tenant_admin`
    pub role: Role,
}

#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl AccountChanges {
    /// Role and active flag need admin rights; the name does not
    pub fn scope(&self) -> FieldScope {
        if self.role.is_some() || self.is_active.is_some() {
            FieldScope::Privileged
        } else {
            FieldScope::NameOnly
        }
    }

    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.role.is_none() && self.is_active.is_none()
    }
}

/// Optional filters for member listings
#[derive(Debug, Clone, Default)]
pub struct MemberQuery {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountView {
    fn from(a: Account) -> Self {
        Self {
            id: a.id,
            tenant_id: a.tenant_id,
            email: a.email,
            full_name: a.full_name,
            role: a.role,
            is_active: a.is_active,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

/// Roles a tenant can hand out
fn ensure_tenant_role(role: Role) -> ServiceResult<Role> {
    match role {
        Role::User | Role::TenantAdmin => Ok(role),
        Role::SuperAdmin => Err(ServiceError::invalid(
            "Invalid role. Must be user or tenant_admin",
        )),
    }
}

#[derive(Clone)]
pub struct AccountService {
    db: PgPool,
    audit: AuditRecorder,
}

impl AccountService {
    pub fn new(db: PgPool, audit: AuditRecorder) -> Self {
        Self { db, audit }
    }

    /// Adds a member to a tenant
    ///
    /// Quota check and insert share one transaction holding the tenant row
    /// lock, so concurrent creations can't overshoot `max_users`.
    ///
    /// # Errors
    ///
    /// - `AccessDenied` unless the caller is a tenant_admin of this tenant
    /// - `InvalidInput` for a bad email, role, name or short password
    /// - `LimitExceeded` when the tenant has `max_users` active accounts
    /// - `Conflict` if the email exists in the tenant
    pub async fn create(
        &self,
        caller: &Caller,
        tenant_id: Uuid,
        input: NewMember,
    ) -> ServiceResult<AccountView> {
        require(&caller.auth, Action::Create, &Resource::TenantMembers { tenant_id })?;

        let email = normalize_email(&input.email)?;
        let full_name = required_text(&input.full_name, "Full name")?;
        let role = ensure_tenant_role(input.role)?;
        validate_password(&input.password).map_err(ServiceError::InvalidInput)?;

        let password_hash = hash_password(&input.password)?;

        let mut tx = self.db.begin().await?;

        QuotaGuard::reserve(&mut tx, tenant_id, QuotaType::Users).await?;

        if Account::find_in_tenant_by_email(&mut *tx, tenant_id, &email)
            .await?
            .is_some()
        {
            return Err(ServiceError::conflict(DUPLICATE_EMAIL));
        }

        let account = Account::create(
            &mut *tx,
            CreateAccount {
                tenant_id: Some(tenant_id),
                email,
                password_hash,
                full_name,
                role,
            },
        )
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::conflict(DUPLICATE_EMAIL)
            } else {
                ServiceError::from(e)
            }
        })?;

        tx.commit().await?;

        tracing::info!(tenant_id = %tenant_id, account_id = %account.id, role = role.as_str(), "Member created");

        self.audit.record(
            caller
                .audit(AuditAction::CreateUser)
                .entity(EntityType::User, account.id),
        );

        Ok(account.into())
    }

    /// Members of a tenant, newest first
    pub async fn list(
        &self,
        ctx: &AuthContext,
        tenant_id: Uuid,
        query: MemberQuery,
        page: PageRequest,
    ) -> ServiceResult<Listing<AccountView>> {
        require(ctx, Action::List, &Resource::TenantMembers { tenant_id })?;

        let filter = AccountFilter {
            tenant_id: Some(tenant_id),
            role: query.role,
            is_active: query.is_active,
            search: query.search,
        };

        let page = Account::list(&self.db, &filter, page).await?;

        Ok(Listing::from_page(page, AccountView::from))
    }

    /// Updates name, role or active flag
    ///
    /// Reactivating an account takes a seat, so it goes through the quota
    /// guard like a creation.
    pub async fn update(
        &self,
        caller: &Caller,
        account_id: Uuid,
        changes: AccountChanges,
    ) -> ServiceResult<AccountView> {
        if changes.is_empty() {
            return Err(ServiceError::invalid("No valid fields to update"));
        }

        let target = Account::find_by_id(&self.db, account_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;

        require(
            &caller.auth,
            Action::Update(changes.scope()),
            &Resource::Account {
                account_id: target.id,
                tenant_id: target.tenant_id,
            },
        )?;

        let full_name = changes
            .full_name
            .as_deref()
            .map(|n| required_text(n, "Full name"))
            .transpose()?;

        if let Some(role) = changes.role {
            ensure_tenant_role(role)?;
            if target.tenant_id.is_none() {
                return Err(ServiceError::invalid("Platform accounts cannot change role"));
            }
        }

        let mut tx = self.db.begin().await?;

        if let (Some(tenant_id), false, Some(true)) =
            (target.tenant_id, target.is_active, changes.is_active)
        {
            QuotaGuard::reserve(&mut tx, tenant_id, QuotaType::Users).await?;
        }

        let account = Account::update(
            &mut *tx,
            account_id,
            UpdateAccount {
                full_name,
                role: changes.role,
                is_active: changes.is_active,
            },
        )
        .await?
        .ok_or_else(|| ServiceError::not_found("User not found"))?;

        tx.commit().await?;

        let mut entry = caller
            .audit(AuditAction::UpdateUser)
            .entity(EntityType::User, account.id);
        if let Some(tenant_id) = account.tenant_id {
            entry = entry.tenant(tenant_id);
        }
        self.audit.record(entry);

        Ok(account.into())
    }

    /// Deletes an account
    ///
    /// Tasks assigned to it are unassigned, not deleted. Both steps run in
    /// one transaction.
    pub async fn delete(&self, caller: &Caller, account_id: Uuid) -> ServiceResult<()> {
        let target = Account::find_by_id(&self.db, account_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;

        require(
            &caller.auth,
            Action::Delete,
            &Resource::Account {
                account_id: target.id,
                tenant_id: target.tenant_id,
            },
        )?;

        let mut tx = self.db.begin().await?;

        let unassigned = Task::unassign_all(&mut *tx, account_id).await?;
        if !Account::delete(&mut *tx, account_id).await? {
            return Err(ServiceError::not_found("User not found"));
        }

        tx.commit().await?;

        tracing::info!(account_id = %account_id, unassigned, "Account deleted");

        let mut entry = caller
            .audit(AuditAction::DeleteUser)
            .entity(EntityType::User, account_id);
        if let Some(tenant_id) = target.tenant_id {
            entry = entry.tenant(tenant_id);
        }
        self.audit.record(entry);

        Ok(())
    }
}
