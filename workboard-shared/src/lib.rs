//! # Workboard Shared Library
//!
//! This crate contains the domain model and business rules shared by the
//! Workboard API server: multi-tenant project/task management with
//! role-based access control.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Credential verification and the authorization engine
//! - `quota`: Subscription limit enforcement
//! - `audit`: Best-effort audit trail
//! - `services`: Tenant, user, project and task operations
//! - `db`: Connection pool and migrations
//! - `error`: Service error taxonomy

pub mod audit;
pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod quota;
pub mod services;

/// Current version of the Workboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
