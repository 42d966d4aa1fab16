//! Pagination and list filtering
//!
//! Every list endpoint needs two queries: one that counts matching rows and one
//! that fetches a page of them. Both are built from a single
//! [`FilterPredicate`] implementation so the `WHERE` clauses can never diverge.
//!
//! ```no_run
//! use sqlx::{Postgres, QueryBuilder};
//! use workboard_shared::models::pagination::FilterPredicate;
//!
//! struct ByName(Option<String>);
//!
//! impl FilterPredicate for ByName {
//!     fn push_predicates(&self, qb: &mut QueryBuilder<'_, Postgres>) {
//!         if let Some(name) = &self.0 {
//!             qb.push(" AND p.name = ").push_bind(name.clone());
//!         }
//!     }
//! }
//! ```

use serde::Serialize;
use sqlx::{Postgres, QueryBuilder};

/// Hard ceiling on page size for every list endpoint
pub const MAX_PAGE_LIMIT: i64 = 100;

/// A validated page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number
    pub page: i64,

    /// Rows per page, always within `1..=MAX_PAGE_LIMIT`
    pub limit: i64,
}

impl PageRequest {
    /// Builds a page request from optional query parameters
    ///
    /// Missing or non-positive values fall back to page 1 and `default_limit`;
    /// the limit is capped at [`MAX_PAGE_LIMIT`].
    pub fn new(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> Self {
        let page = page.filter(|p| *p >= 1).unwrap_or(1);
        let limit = limit
            .filter(|l| *l >= 1)
            .unwrap_or(default_limit)
            .min(MAX_PAGE_LIMIT);

        Self { page, limit }
    }

    /// Number of rows to skip
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Appends `LIMIT .. OFFSET ..` to a listing query
    pub fn push_limit_offset(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" LIMIT ")
            .push_bind(self.limit)
            .push(" OFFSET ")
            .push_bind(self.offset());
    }
}

/// One page of results plus the total row count
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub request: PageRequest,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> i64 {
        if self.total == 0 {
            0
        } else {
            (self.total + self.request.limit - 1) / self.request.limit
        }
    }

    /// Maps the items while keeping paging metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            request: self.request,
        }
    }

    pub fn info(&self) -> PageInfo {
        PageInfo {
            current_page: self.request.page,
            total_pages: self.total_pages(),
            limit: self.request.limit,
            total: self.total,
        }
    }
}

/// External pagination shape
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub current_page: i64,
    pub total_pages: i64,
    pub limit: i64,

    /// Rows matching the filter across all pages
    pub total: i64,
}

/// Filter shared by a count query and its paginated listing query
///
/// Implementations append `AND ...` fragments; the base query must already end
/// in a `WHERE` clause (typically `WHERE 1=1`).
pub trait FilterPredicate {
    fn push_predicates(&self, qb: &mut QueryBuilder<'_, Postgres>);
}

/// Wraps a search term for `ILIKE` substring matching
///
/// `%`, `_` and `\` in user input are escaped so they match literally.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
