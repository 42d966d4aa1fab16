//! Credential verification
//!
//! Turns a bearer token into an [`AuthContext`]. The token only identifies
//! the account; role, tenant and active flag are re-read from the store on
//! every request so that demotions and deactivations take effect immediately.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::jwt::{validate_token, JwtError};
use crate::models::account::{Account, Role};

/// Authenticated caller, the sole input to authorization decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthContext {
    pub account_id: Uuid,

    /// `None` only for super_admin
    pub tenant_id: Option<Uuid>,

    pub role: Role,
}

impl AuthContext {
    pub fn from_account(account: &Account) -> Self {
        Self {
            account_id: account.id,
            tenant_id: account.tenant_id,
            role: account.role,
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    /// Whether the context belongs to `tenant_id`
    ///
    /// Always false for platform accounts.
    pub fn in_tenant(&self, tenant_id: Uuid) -> bool {
        self.tenant_id == Some(tenant_id)
    }
}

/// Credential verification failures
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authentication required. Please provide a valid token.")]
    MissingCredentials,

    #[error("Invalid authorization header format")]
    InvalidFormat,

    #[error("Invalid or expired token")]
    InvalidToken(#[source] JwtError),

    #[error("User not found")]
    AccountNotFound,

    #[error("Account is inactive")]
    AccountInactive,

    #[error("Authentication error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Extracts the token from an `Authorization: Bearer <token>` header value
///
/// # Example
///
/// ```
/// use workboard_shared::auth::verifier::parse_bearer;
///
/// assert_eq!(parse_bearer(Some("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
/// assert!(parse_bearer(Some("Basic dXNlcg==")).is_err());
/// assert!(parse_bearer(None).is_err());
/// ```
pub fn parse_bearer(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingCredentials)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidFormat)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::InvalidFormat);
    }

    Ok(token)
}

/// Builds the context from the freshly loaded account row
pub fn resolve_context(account: Option<&Account>) -> Result<AuthContext, AuthError> {
    let account = account.ok_or(AuthError::AccountNotFound)?;

    if !account.is_active {
        return Err(AuthError::AccountInactive);
    }

    Ok(AuthContext::from_account(account))
}

/// Verifies a bearer token and resolves it to an active account
///
/// # Errors
///
/// - [`AuthError::InvalidToken`] for a bad signature, expiry or malformed token
/// - [`AuthError::AccountNotFound`] if the account was deleted since issuance
/// - [`AuthError::AccountInactive`] if the account has been deactivated
pub async fn verify_credential(
    pool: &PgPool,
    token: &str,
    secret: &str,
) -> Result<AuthContext, AuthError> {
    let claims = validate_token(token, secret).map_err(AuthError::InvalidToken)?;

    let account = Account::find_by_id(pool, claims.sub).await?;
    let ctx = resolve_context(account.as_ref())?;

    tracing::debug!(
        account_id = %ctx.account_id,
        role = ctx.role.as_str(),
        "Credential verified"
    );

    Ok(ctx)
}
