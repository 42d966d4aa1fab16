//! Resource services
//!
//! Each service follows the same sequence for every operation:
//!
//! 1. take the caller's [`AuthContext`] (already verified)
//! 2. load the target and ask [`crate::auth::authorization::authorize`]
//! 3. reserve quota with [`crate::quota::QuotaGuard`] for creations that consume it
//! 4. mutate, inside a transaction where more than one statement is involved
//! 5. queue an audit entry
//! 6. return a view type with the stable external field names
//!
//! Validation and authorization failures return before any write.

use serde::Serialize;

use crate::audit::{AuditAction, AuditEntry};
use crate::auth::verifier::AuthContext;
use crate::error::ServiceError;
use crate::models::pagination::{Page, PageInfo};

pub mod accounts;
pub mod projects;
pub mod sessions;
pub mod tasks;
pub mod tenants;

pub use accounts::AccountService;
pub use projects::ProjectService;
pub use sessions::SessionService;
pub use tasks::TaskService;
pub use tenants::TenantService;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// An authenticated caller plus request metadata for the audit trail
#[derive(Debug, Clone)]
pub struct Caller {
    pub auth: AuthContext,
    pub ip_address: Option<String>,
}

impl Caller {
    pub fn new(auth: AuthContext, ip_address: Option<String>) -> Self {
        Self { auth, ip_address }
    }

    /// Audit entry attributed to this caller
    pub fn audit(&self, action: AuditAction) -> AuditEntry {
        AuditEntry::by(&self.auth, action).ip(self.ip_address.clone())
    }
}

/// One page of view items
#[derive(Debug, Clone, Serialize)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub pagination: PageInfo,
}

impl<T> Listing<T> {
    pub fn from_page<R>(page: Page<R>, f: impl FnMut(R) -> T) -> Self {
        let pagination = page.info();
        Self {
            items: page.map(f).items,
            pagination,
        }
    }
}

/// Trims a required text field, rejecting blanks
pub(crate) fn required_text(value: &str, field: &str) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::invalid(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Lowercases and sanity-checks an email address
pub(crate) fn normalize_email(email: &str) -> ServiceResult<String> {
    let email = email.trim().to_lowercase();

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(ServiceError::invalid("Invalid email address")),
    }
}

/// Optional description: blank becomes `None`
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
