//! Subscription limit enforcement
//!
//! Each tenant row carries `max_users` and `max_projects`. Before an account
//! or project is created the guard locks the tenant row, counts what the
//! tenant already has and refuses when the count has reached the ceiling.
//!
//! The check must run inside the same transaction as the insert it guards:
//! the `FOR UPDATE` lock makes a second concurrent creation for the same
//! tenant wait until the first commits, so it sees the new count.
//!
//! # Example
//!
//! ```no_run
//! use workboard_shared::quota::{QuotaGuard, QuotaType};
//! use sqlx::PgPool;
//! use uuid::Uuid;
//!
//! # async fn example(pool: PgPool, tenant_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
//! let mut tx = pool.begin().await?;
//! QuotaGuard::reserve(&mut tx, tenant_id, QuotaType::Projects).await?;
//! // ... insert the project on the same transaction ...
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;

use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::account::Account;
use crate::models::project::Project;
use crate::models::tenant::{SubscriptionPlan, Tenant};

/// Errors from quota enforcement
#[derive(Debug)]
pub enum QuotaError {
    /// The tenant is at its ceiling
    LimitExceeded {
        quota_type: QuotaType,
        limit: i64,
        current: i64,
    },

    TenantNotFound(Uuid),

    DatabaseError(sqlx::Error),
}

impl fmt::Display for QuotaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotaError::LimitExceeded { quota_type, .. } => write!(
                f,
                "Subscription limit reached. Maximum {} limit exceeded.",
                quota_type.as_str()
            ),
            QuotaError::TenantNotFound(_) => write!(f, "Tenant not found"),
            QuotaError::DatabaseError(err) => write!(f, "Database error: {}", err),
        }
    }
}

impl std::error::Error for QuotaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QuotaError::DatabaseError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for QuotaError {
    fn from(err: sqlx::Error) -> Self {
        QuotaError::DatabaseError(err)
    }
}

/// What a creation consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaType {
    /// Active accounts
    Users,

    Projects,
}

impl QuotaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotaType::Users => "users",
            QuotaType::Projects => "projects",
        }
    }
}

/// Ceilings granted by a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanLimits {
    pub max_users: i32,
    pub max_projects: i32,
}

impl PlanLimits {
    /// Static plan table
    ///
    /// | Plan       | Users | Projects |
    /// |------------|-------|----------|
    /// | free       | 5     | 3        |
    /// | pro        | 25    | 15       |
    /// | enterprise | 100   | 50       |
    pub fn for_plan(plan: SubscriptionPlan) -> Self {
        match plan {
            SubscriptionPlan::Free => PlanLimits {
                max_users: 5,
                max_projects: 3,
            },
            SubscriptionPlan::Pro => PlanLimits {
                max_users: 25,
                max_projects: 15,
            },
            SubscriptionPlan::Enterprise => PlanLimits {
                max_users: 100,
                max_projects: 50,
            },
        }
    }
}

/// Outcome of comparing a count with a ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaCheckResult {
    pub allowed: bool,
    pub current: i64,
    pub limit: i64,
    pub remaining: i64,
}

impl QuotaCheckResult {
    /// Room remains while `current < limit`
    pub fn evaluate(current: i64, limit: i64) -> Self {
        if current < limit {
            QuotaCheckResult {
                allowed: true,
                current,
                limit,
                remaining: limit - current,
            }
        } else {
            QuotaCheckResult {
                allowed: false,
                current,
                limit,
                remaining: 0,
            }
        }
    }
}

/// Transactional check-then-insert guard
pub struct QuotaGuard;

impl QuotaGuard {
    /// Locks the tenant row and verifies there is room for one more
    ///
    /// `conn` must be a connection inside an open transaction; the lock is
    /// held until that transaction commits or rolls back.
    ///
    /// # Errors
    ///
    /// - [`QuotaError::TenantNotFound`] if the tenant doesn't exist
    /// - [`QuotaError::LimitExceeded`] if the tenant is at its ceiling
    pub async fn reserve(
        conn: &mut PgConnection,
        tenant_id: Uuid,
        quota_type: QuotaType,
    ) -> Result<QuotaCheckResult, QuotaError> {
        let tenant = Tenant::lock_for_update(&mut *conn, tenant_id)
            .await?
            .ok_or(QuotaError::TenantNotFound(tenant_id))?;

        let (current, limit) = match quota_type {
            QuotaType::Users => (
                Account::count_active_in_tenant(&mut *conn, tenant_id).await?,
                i64::from(tenant.max_users),
            ),
            QuotaType::Projects => (
                Project::count_in_tenant(&mut *conn, tenant_id).await?,
                i64::from(tenant.max_projects),
            ),
        };

        let result = QuotaCheckResult::evaluate(current, limit);

        if !result.allowed {
            tracing::info!(
                tenant_id = %tenant_id,
                quota = quota_type.as_str(),
                current,
                limit,
                "Quota exceeded"
            );

            return Err(QuotaError::LimitExceeded {
                quota_type,
                limit,
                current,
            });
        }

        tracing::debug!(
            tenant_id = %tenant_id,
            quota = quota_type.as_str(),
            remaining = result.remaining,
            "Quota reserved"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_limits() {
        assert_eq!(
            PlanLimits::for_plan(SubscriptionPlan::Free),
            PlanLimits {
                max_users: 5,
                max_projects: 3
            }
        );
        assert_eq!(
            PlanLimits::for_plan(SubscriptionPlan::Pro),
            PlanLimits {
                max_users: 25,
                max_projects: 15
            }
        );
        assert_eq!(
            PlanLimits::for_plan(SubscriptionPlan::Enterprise),
            PlanLimits {
                max_users: 100,
                max_projects: 50
            }
        );
    }

    #[test]
    fn test_evaluate_boundary() {
        let below = QuotaCheckResult::evaluate(4, 5);
        assert!(below.allowed);
        assert_eq!(below.remaining, 1);

        let at = QuotaCheckResult::evaluate(5, 5);
        assert!(!at.allowed);
        assert_eq!(at.remaining, 0);

        let over = QuotaCheckResult::evaluate(7, 5);
        assert!(!over.allowed);
    }

    #[test]
    fn test_zero_ceiling_blocks_everything() {
        assert!(!QuotaCheckResult::evaluate(0, 0).allowed);
    }

    #[test]
    fn test_quota_error_display() {
        let err = QuotaError::LimitExceeded {
            quota_type: QuotaType::Users,
            limit: 5,
            current: 5,
        };
        assert_eq!(
            err.to_string(),
            "Subscription limit reached. Maximum users limit exceeded."
        );

        let err = QuotaError::LimitExceeded {
            quota_type: QuotaType::Projects,
            limit: 3,
            current: 3,
        };
        assert_eq!(
            err.to_string(),
            "Subscription limit reached. Maximum projects limit exceeded."
        );

        assert_eq!(
            QuotaError::TenantNotFound(Uuid::nil()).to_string(),
            "Tenant not found"
        );
    }
}
