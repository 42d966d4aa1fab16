//! # Workboard API Server Library
//!
//! HTTP surface of the Workboard multi-tenant project/task service.
//!
//! ## Modules
//!
//! - `app`: Application state, router and the auth layer
//! - `config`: Environment configuration
//! - `error`: Error envelope and HTTP status mapping
//! - `extract`: Request extractors (caller, client IP, JSON/query/path)
//! - `response`: Success envelope
//! - `routes`: Route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod response;
pub mod routes;
