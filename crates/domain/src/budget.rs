//! TokenBudget (§3, §4.2): one row per calendar month. Invariant: `0 <=
//! tokens_used <= monthly_limit`.

use serde::{Deserialize, Serialize};
use smartacus_core::types::YearMonth;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TokenBudget {
    pub year_month: String,
    pub monthly_limit: i64,
    pub tokens_used: i64,
    pub discovery_allocation_percent: f64,
    pub scanning_allocation_percent: f64,
    pub runs_completed: i32,
    pub categories_scanned: i32,
    pub opportunities_found: i32,
}

impl TokenBudget {
    pub fn new(month: &YearMonth, monthly_limit: i64, discovery_pct: f64, scanning_pct: f64) -> Self {
        Self {
            year_month: month.as_str().to_string(),
            monthly_limit,
            tokens_used: 0,
            discovery_allocation_percent: discovery_pct,
            scanning_allocation_percent: scanning_pct,
            runs_completed: 0,
            categories_scanned: 0,
            opportunities_found: 0,
        }
    }

    pub fn tokens_remaining(&self) -> i64 {
        (self.monthly_limit - self.tokens_used).max(0)
    }

    pub fn utilization_pct(&self) -> f64 {
        if self.monthly_limit == 0 {
            return 0.0;
        }
        self.tokens_used as f64 / self.monthly_limit as f64 * 100.0
    }
}
