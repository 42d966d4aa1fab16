//! Authentication and authorization
//!
//! # Modules
//!
//! - [`password`]: Argon2id password hashing and the length rule
//! - [`jwt`]: HS256 session tokens
//! - [`verifier`]: bearer token to [`verifier::AuthContext`], re-checked against the store
//! - [`authorization`]: the pure role/tenant decision function
//!
//! # Example
//!
//! ```no_run
//! use workboard_shared::auth::authorization::{require, Action, Resource};
//! use workboard_shared::auth::verifier::{parse_bearer, verify_credential};
//! use sqlx::PgPool;
//!
//! # async fn example(pool: PgPool, header: Option<&str>, secret: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let token = parse_bearer(header)?;
//! let ctx = verify_credential(&pool, token, secret).await?;
//!
//! require(&ctx, Action::List, &Resource::TenantDirectory)?;
//! # Ok(())
//! # }
//! ```

pub mod authorization;
pub mod jwt;
pub mod password;
pub mod verifier;
