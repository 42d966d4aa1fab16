//! Route handlers, one module per resource
//!
//! Handlers translate JSON bodies and query strings into service inputs and
//! wrap the results in [`crate::response::ApiResponse`]. They hold no
//! business rules of their own.

pub mod auth;
pub mod health;
pub mod projects;
pub mod tasks;
pub mod tenants;
pub mod users;

use serde::{Deserialize, Deserializer};

/// Tells an absent field (`None`) from an explicit `null` (`Some(None)`)
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
