//! Role and tenant authorization
//!
//! Every access decision in Workboard goes through [`authorize`], a pure
//! function of the caller's [`AuthContext`], the [`Action`] and the
//! [`Resource`] it targets. Services load the resource first, describe it as
//! a `Resource` and ask for a [`Decision`]; no handler carries its own role
//! checks.
//!
//! # Role model
//!
//! - `super_admin`: platform-wide, has no tenant, bypasses tenant scoping
//!   except where it has no tenant to act in (creating projects and
//!   members).
//! - `tenant_admin`: full control inside its own tenant.
//! - `user`: own tenant only; may manage only projects it created and may
//!   rename only itself.
//!
//! # Precedence
//!
//! 1. A context whose tenant doesn't match its role (a tenantless non-super
//!    account, or a super_admin with a tenant) is denied outright.
//! 2. Deleting one's own account is denied for every role.
//! 3. The per-resource rules below decide.
//!
//! # Example
//!
//! ```
//! use uuid::Uuid;
//! use workboard_shared::auth::authorization::{authorize, Action, Decision, Resource};
//! use workboard_shared::auth::verifier::AuthContext;
//! use workboard_shared::models::account::Role;
//!
//! let tenant_id = Uuid::new_v4();
//! let member = AuthContext { account_id: Uuid::new_v4(), tenant_id: Some(tenant_id), role: Role::User };
//!
//! let someone_elses = Resource::Project { tenant_id, created_by: Some(Uuid::new_v4()) };
//! assert!(!authorize(&member, Action::Delete, &someone_elses).is_allowed());
//!
//! let own = Resource::Project { tenant_id, created_by: Some(member.account_id) };
//! assert_eq!(authorize(&member, Action::Delete, &own), Decision::Allow);
//! ```

use uuid::Uuid;

use super::verifier::AuthContext;
use crate::models::account::Role;

/// Which fields an update touches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldScope {
    /// Only the display name (tenant `name`, account `fullName`)
    NameOnly,

    /// Anything beyond the name: role, active flag, plan, ceilings, status
    Privileged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    List,
    Create,
    Update(FieldScope),
    Delete,
}

/// The target of an action, described by the attributes the rules need
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// The platform-wide tenant directory
    TenantDirectory,

    Tenant { tenant_id: Uuid },

    /// The member roster of a tenant (create/list users)
    TenantMembers { tenant_id: Uuid },

    Account {
        account_id: Uuid,
        tenant_id: Option<Uuid>,
    },

    /// The caller's project collection
    ProjectCatalog,

    Project {
        tenant_id: Uuid,
        created_by: Option<Uuid>,
    },

    /// The task collection of one project
    ProjectTasks { tenant_id: Uuid },

    Task { tenant_id: Uuid },
}

/// Why access was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DenyReason {
    #[error("Invalid authentication context")]
    InconsistentContext,

    #[error("Cannot delete yourself")]
    SelfDeletion,

    #[error("Super admin access required")]
    SuperAdminOnly,

    #[error("Access denied to this tenant")]
    CrossTenant,

    #[error("Insufficient permissions")]
    InsufficientRole,

    #[error("You can only modify resources you created")]
    NotOwner,

    #[error("Insufficient permissions to modify these fields")]
    RestrictedFields,

    /// The action needs a tenant to act in and the caller is platform-level
    #[error("Super admin cannot perform this action without a tenant")]
    NoTenant,

    #[error("Super admin cannot create projects")]
    SuperAdminProjectCreate,

    #[error("Action not supported on this resource")]
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Converts into a `Result` for `?` propagation
    pub fn into_result(self) -> Result<(), DenyReason> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason),
        }
    }
}

/// Decides whether `ctx` may perform `action` on `resource`
pub fn authorize(ctx: &AuthContext, action: Action, resource: &Resource) -> Decision {
    if ctx.role.is_tenant_scoped() == ctx.tenant_id.is_none() {
        return Decision::Deny(DenyReason::InconsistentContext);
    }

    if let (Action::Delete, Resource::Account { account_id, .. }) = (action, resource) {
        if *account_id == ctx.account_id {
            return Decision::Deny(DenyReason::SelfDeletion);
        }
    }

    match *resource {
        Resource::TenantDirectory => tenant_directory(ctx, action),
        Resource::Tenant { tenant_id } => tenant(ctx, action, tenant_id),
        Resource::TenantMembers { tenant_id } => tenant_members(ctx, action, tenant_id),
        Resource::Account {
            account_id,
            tenant_id,
        } => account(ctx, action, account_id, tenant_id),
        Resource::ProjectCatalog => project_catalog(ctx, action),
        Resource::Project {
            tenant_id,
            created_by,
        } => project(ctx, action, tenant_id, created_by),
        Resource::ProjectTasks { tenant_id } => project_tasks(ctx, action, tenant_id),
        Resource::Task { tenant_id } => task(ctx, action, tenant_id),
    }
}

/// [`authorize`] as a `Result`
pub fn require(ctx: &AuthContext, action: Action, resource: &Resource) -> Result<(), DenyReason> {
    authorize(ctx, action, resource).into_result()
}

fn deny(reason: DenyReason) -> Decision {
    Decision::Deny(reason)
}

/// Tenant match for tenant-scoped roles
fn scoped(ctx: &AuthContext, tenant_id: Uuid) -> Decision {
    if ctx.in_tenant(tenant_id) {
        Decision::Allow
    } else {
        deny(DenyReason::CrossTenant)
    }
}

fn tenant_directory(ctx: &AuthContext, action: Action) -> Decision {
    match action {
        Action::List | Action::View if ctx.is_super_admin() => Decision::Allow,
        Action::List | Action::View => deny(DenyReason::SuperAdminOnly),
        _ => deny(DenyReason::Unsupported),
    }
}

fn tenant(ctx: &AuthContext, action: Action, tenant_id: Uuid) -> Decision {
    match (action, ctx.role) {
        (Action::View | Action::Update(_), Role::SuperAdmin) => Decision::Allow,
        (Action::View | Action::Update(_), Role::User) => deny(DenyReason::InsufficientRole),
        (Action::View, Role::TenantAdmin) => scoped(ctx, tenant_id),
        (Action::Update(scope), Role::TenantAdmin) => match scoped(ctx, tenant_id) {
            Decision::Allow if scope == FieldScope::Privileged => {
                deny(DenyReason::RestrictedFields)
            }
            decision => decision,
        },
        _ => deny(DenyReason::Unsupported),
    }
}

fn tenant_members(ctx: &AuthContext, action: Action, tenant_id: Uuid) -> Decision {
    match (action, ctx.role) {
        (Action::Create, Role::SuperAdmin) => deny(DenyReason::NoTenant),
        (Action::List | Action::View, Role::SuperAdmin) => Decision::Allow,
        (Action::Create | Action::List | Action::View, Role::TenantAdmin) => {
            scoped(ctx, tenant_id)
        }
        (Action::Create | Action::List | Action::View, Role::User) => {
            deny(DenyReason::InsufficientRole)
        }
        _ => deny(DenyReason::Unsupported),
    }
}

fn account(
    ctx: &AuthContext,
    action: Action,
    account_id: Uuid,
    tenant_id: Option<Uuid>,
) -> Decision {
    let is_self = account_id == ctx.account_id;
    let same_tenant = tenant_id.is_some_and(|t| ctx.in_tenant(t));

    match (action, ctx.role) {
        (Action::View | Action::Update(_) | Action::Delete, Role::SuperAdmin) => Decision::Allow,

        (Action::View | Action::Update(_) | Action::Delete, Role::TenantAdmin) => {
            if same_tenant {
                Decision::Allow
            } else {
                deny(DenyReason::CrossTenant)
            }
        }

        (Action::View, Role::User) if is_self => Decision::Allow,
        (Action::Update(FieldScope::NameOnly), Role::User) if is_self => Decision::Allow,
        (Action::Update(FieldScope::Privileged), Role::User) if is_self => {
            deny(DenyReason::RestrictedFields)
        }
        (Action::View | Action::Update(_), Role::User) if same_tenant => {
            deny(DenyReason::NotOwner)
        }
        (Action::View | Action::Update(_), Role::User) => deny(DenyReason::CrossTenant),
        (Action::Delete, Role::User) => deny(DenyReason::InsufficientRole),

        _ => deny(DenyReason::Unsupported),
    }
}

fn project_catalog(ctx: &AuthContext, action: Action) -> Decision {
    match action {
        Action::Create if ctx.is_super_admin() => deny(DenyReason::SuperAdminProjectCreate),
        // Listing is scoped by the query, not here
        Action::Create | Action::List => Decision::Allow,
        _ => deny(DenyReason::Unsupported),
    }
}

fn project(
    ctx: &AuthContext,
    action: Action,
    tenant_id: Uuid,
    created_by: Option<Uuid>,
) -> Decision {
    match (action, ctx.role) {
        (Action::View | Action::Update(_) | Action::Delete, Role::SuperAdmin) => Decision::Allow,
        (Action::View | Action::Update(_) | Action::Delete, Role::TenantAdmin) => {
            scoped(ctx, tenant_id)
        }
        (Action::View, Role::User) => scoped(ctx, tenant_id),
        (Action::Update(_) | Action::Delete, Role::User) => match scoped(ctx, tenant_id) {
            Decision::Allow if created_by == Some(ctx.account_id) => Decision::Allow,
            Decision::Allow => deny(DenyReason::NotOwner),
            decision => decision,
        },
        _ => deny(DenyReason::Unsupported),
    }
}

fn project_tasks(ctx: &AuthContext, action: Action, tenant_id: Uuid) -> Decision {
    match action {
        Action::Create | Action::List | Action::View if ctx.is_super_admin() => Decision::Allow,
        Action::Create | Action::List | Action::View => scoped(ctx, tenant_id),
        _ => deny(DenyReason::Unsupported),
    }
}

fn task(ctx: &AuthContext, action: Action, tenant_id: Uuid) -> Decision {
    match action {
        Action::View | Action::Update(_) if ctx.is_super_admin() => Decision::Allow,
        Action::View | Action::Update(_) => scoped(ctx, tenant_id),
        _ => deny(DenyReason::Unsupported),
    }
}
