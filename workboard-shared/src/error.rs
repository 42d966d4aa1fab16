//! Service-level error taxonomy
//!
//! Every resource service returns [`ServiceError`]. The HTTP layer maps each
//! variant to one status code; the message of every variant except
//! `Internal` is safe to show to the caller.

use crate::auth::authorization::DenyReason;
use crate::auth::jwt::JwtError;
use crate::auth::password::PasswordError;
use crate::quota::QuotaError;

/// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Postgres SQLSTATE for foreign_key_violation
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Malformed or out-of-range input (400)
    #[error("{0}")]
    InvalidInput(String),

    /// Missing, invalid or rejected credentials (401)
    #[error("{0}")]
    Unauthenticated(String),

    /// Role, tenant or ownership check failed (403)
    #[error("{0}")]
    AccessDenied(String),

    /// Subscription ceiling reached (403)
    #[error("{0}")]
    LimitExceeded(String),

    /// 404
    #[error("{0}")]
    NotFound(String),

    /// Uniqueness violation (409)
    #[error("{0}")]
    Conflict(String),

    /// Unexpected failure (500); detail is logged, never returned
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ServiceError::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ServiceError::NotFound(msg.into())
    }

    pub fn denied(msg: impl Into<String>) -> Self {
        ServiceError::AccessDenied(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ServiceError::Conflict(msg.into())
    }
}

/// Whether a store error is a unique-constraint violation
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION))
}

/// Whether a store error violates the named foreign key constraint
pub fn is_foreign_key_violation(err: &sqlx::Error, constraint: &str) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db)
            if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION)
                && db.constraint() == Some(constraint)
    )
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        if is_unique_violation(&err) {
            return ServiceError::Conflict("Resource already exists".to_string());
        }

        match err {
            sqlx::Error::RowNotFound => ServiceError::NotFound("Resource not found".to_string()),
            other => ServiceError::Internal(format!("Database error: {}", other)),
        }
    }
}

impl From<DenyReason> for ServiceError {
    fn from(reason: DenyReason) -> Self {
        ServiceError::AccessDenied(reason.to_string())
    }
}

impl From<QuotaError> for ServiceError {
    fn from(err: QuotaError) -> Self {
        match err {
            QuotaError::LimitExceeded { .. } => ServiceError::LimitExceeded(err.to_string()),
            QuotaError::TenantNotFound(_) => ServiceError::NotFound(err.to_string()),
            QuotaError::DatabaseError(e) => ServiceError::from(e),
        }
    }
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl From<JwtError> for ServiceError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => ServiceError::Internal(msg),
            other => ServiceError::Unauthenticated(other.to_string()),
        }
    }
}
