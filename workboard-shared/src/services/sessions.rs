//! Login, session profile and logout

use chrono::Duration;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::{normalize_email, Caller, ServiceResult};
use crate::audit::{AuditAction, AuditEntry, AuditRecorder, EntityType};
use crate::auth::jwt::{create_token, Claims};
use crate::auth::password::{verify_dummy, verify_password};
use crate::auth::verifier::AuthContext;
use crate::error::ServiceError;
use crate::models::account::{Account, Role};
use crate::models::tenant::{SubscriptionPlan, Tenant, TenantStatus};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// How the login names its tenant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantSelector {
    Subdomain(String),
    Id(Uuid),
}

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub tenant: TenantSelector,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub tenant_id: Option<Uuid>,
}

impl From<&Account> for SessionUser {
    fn from(a: &Account) -> Self {
        Self {
            id: a.id,
            email: a.email.clone(),
            full_name: a.full_name.clone(),
            role: a.role,
            tenant_id: a.tenant_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginView {
    pub user: SessionUser,
    pub token: String,

    /// Seconds
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantBrief {
    pub id: Uuid,
    pub name: String,
    pub subdomain: String,
    pub status: TenantStatus,
    pub subscription_plan: SubscriptionPlan,
    pub max_users: i32,
    pub max_projects: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    #[serde(flatten)]
    pub user: SessionUser,
    pub is_active: bool,

    /// `None` for platform accounts
    pub tenant: Option<TenantBrief>,
}

#[derive(Clone)]
pub struct SessionService {
    db: PgPool,
    audit: AuditRecorder,
    jwt_secret: String,
    token_ttl: Duration,
}

impl SessionService {
    pub fn new(db: PgPool, audit: AuditRecorder, jwt_secret: String, token_ttl: Duration) -> Self {
        Self {
            db,
            audit,
            jwt_secret,
            token_ttl,
        }
    }

    /// Authenticates against a tenant and issues a session token
    ///
    /// The account is looked up inside the named tenant first; if none
    /// matches, a platform account with the same email may log in instead.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the tenant doesn't exist
    /// - `AccessDenied` if the tenant is not active or the account is inactive
    /// - `Unauthenticated` ("Invalid credentials") for an unknown email or
    ///   wrong password; the two are indistinguishable to the caller
    pub async fn login(
        &self,
        input: LoginRequest,
        ip_address: Option<String>,
    ) -> ServiceResult<LoginView> {
        let tenant = match &input.tenant {
            TenantSelector::Subdomain(subdomain) => {
                Tenant::find_by_subdomain(&self.db, subdomain.trim()).await?
            }
            TenantSelector::Id(id) => Tenant::find_by_id(&self.db, *id).await?,
        }
        .ok_or_else(|| ServiceError::not_found("Tenant not found"))?;

        if tenant.status != TenantStatus::Active {
            tracing::info!(tenant_id = %tenant.id, status = tenant.status.as_str(), "Login to inactive tenant refused");
            return Err(ServiceError::denied("Tenant account is suspended"));
        }

        let email = normalize_email(&input.email)
            .map_err(|_| ServiceError::Unauthenticated(INVALID_CREDENTIALS.to_string()))?;

        let account = match Account::find_in_tenant_by_email(&self.db, tenant.id, &email).await? {
            Some(account) => Some(account),
            None => Account::find_platform_by_email(&self.db, &email)
                .await?
                .filter(|a| a.role == Role::SuperAdmin),
        };

        let Some(account) = account else {
            verify_dummy(&input.password);
            return Err(ServiceError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
        };

        if !verify_password(&input.password, &account.password_hash)? {
            tracing::debug!(account_id = %account.id, "Password mismatch");
            return Err(ServiceError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
        }

        if !account.is_active {
            return Err(ServiceError::denied("Account is inactive"));
        }

        let claims = Claims::new(account.id, account.tenant_id, account.role, self.token_ttl);
        let token = create_token(&claims, &self.jwt_secret)?;

        tracing::info!(account_id = %account.id, tenant_id = %tenant.id, "Login succeeded");

        self.audit.record(
            AuditEntry::new(AuditAction::Login, account.tenant_id, account.id)
                .entity(EntityType::User, account.id)
                .ip(ip_address),
        );

        Ok(LoginView {
            user: SessionUser::from(&account),
            token,
            expires_in: self.token_ttl.num_seconds(),
        })
    }

    /// Profile of the authenticated account
    pub async fn me(&self, ctx: &AuthContext) -> ServiceResult<ProfileView> {
        let account = Account::find_by_id(&self.db, ctx.account_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;

        let tenant = match account.tenant_id {
            Some(tenant_id) => Tenant::find_by_id(&self.db, tenant_id)
                .await?
                .map(|t| TenantBrief {
                    id: t.id,
                    name: t.name,
                    subdomain: t.subdomain,
                    status: t.status,
                    subscription_plan: t.subscription_plan,
                    max_users: t.max_users,
                    max_projects: t.max_projects,
                }),
            None => None,
        };

        Ok(ProfileView {
            user: SessionUser::from(&account),
            is_active: account.is_active,
            tenant,
        })
    }

    /// Records the logout; tokens are stateless and simply expire
    pub fn logout(&self, caller: &Caller) {
        self.audit.record(caller.audit(AuditAction::Logout));
    }
}
