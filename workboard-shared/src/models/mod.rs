//! Database models for Workboard
//!
//! This module contains all database models and their CRUD operations.
//!
//! # Models
//!
//! - `tenant`: Organizations, their subscription plan and ceilings
//! - `account`: User accounts (table `users`), scoped to a tenant or platform-level
//! - `project`: Projects owned by a tenant
//! - `task`: Tasks inside a project
//! - `audit_log`: Append-only audit trail
//! - `pagination`: Page requests and the shared filter-predicate seam
//!
//! Query functions are generic over [`sqlx::PgExecutor`] so the same call
//! works against the pool or inside a transaction:
//!
//! ```no_run
//! use workboard_shared::models::tenant::Tenant;
//! use sqlx::PgPool;
//! use uuid::Uuid;
//!
//! # async fn example(pool: PgPool, id: Uuid) -> Result<(), sqlx::Error> {
//! let mut tx = pool.begin().await?;
//! let locked = Tenant::lock_for_update(&mut *tx, id).await?;
//! tx.commit().await?;
//!
//! let tenant = Tenant::find_by_id(&pool, id).await?;
//! # Ok(())
//! # }
//! ```

pub mod account;
pub mod audit_log;
pub mod pagination;
pub mod project;
pub mod task;
pub mod tenant;
