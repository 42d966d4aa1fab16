//! Database layer
//!
//! - [`pool`]: PostgreSQL connection pool, health check and pool statistics
//! - [`migrations`]: embedded schema migrations and their status
//!
//! Row types and queries live in [`crate::models`].
//!
//! # Example
//!
//! ```no_run
//! use workboard_shared::db::pool::{create_pool, PoolConfig};
//! use workboard_shared::db::migrations::run_migrations;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool(PoolConfig::new(std::env::var("DATABASE_URL")?)).await?;
//! run_migrations(&pool).await?;
//! # Ok(())
//! # }
//! ```

pub mod migrations;
pub mod pool;
