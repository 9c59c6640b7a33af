//! Shared primitive types used across every Smartacus crate.

use serde::{Deserialize, Serialize};

/// Pagination request for store queries that can return many rows.
#[derive(Debug, Clone, Copy)]
pub struct PaginationOptions {
    pub page: i64,
    pub limit: i64,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self { page: 1, limit: 50 }
    }
}

/// Paginated result wrapper.
#[derive(Debug, Clone)]
pub struct PaginationResult<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl<T> PaginationResult<T> {
    pub fn new(items: Vec<T>, total: i64, pagination: PaginationOptions) -> Self {
        let total_pages = if pagination.limit > 0 {
            (total + pagination.limit - 1) / pagination.limit
        } else {
            0
        };
        Self {
            items,
            total,
            page: pagination.page,
            limit: pagination.limit,
            total_pages,
        }
    }
}

/// `year-month` key used by the token budget table, e.g. `"2026-07"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth(pub String);

impl YearMonth {
    pub fn from_date(date: chrono::NaiveDate) -> Self {
        use chrono::Datelike;
        Self(format!("{:04}-{:02}", date.year(), date.month()))
    }

    pub fn current() -> Self {
        Self::from_date(chrono::Utc::now().date_naive())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
