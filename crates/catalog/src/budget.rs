//! Monthly token budget manager (§4.2, C2): the gate between the scheduler
//! and the remote catalog — every pipeline cycle must check `can_run` before
//! spending tokens, and report spend back through `record_run`.

use crate::error::Result;
use chrono::{Datelike, Utc};
use smartacus_core::types::YearMonth;
use smartacus_domain::store::BudgetStore;
use smartacus_domain::TokenBudget;
use std::sync::Arc;

/// What a reserved allocation is for — discovery calls and scanning calls
/// draw from separate percentage splits of the monthly limit (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpendKind {
    Discovery,
    Scanning,
}

pub struct TokenBudgetManager {
    store: Arc<dyn BudgetStore>,
    monthly_limit: i64,
    discovery_pct: f64,
    scanning_pct: f64,
}

impl TokenBudgetManager {
    pub fn new(store: Arc<dyn BudgetStore>, monthly_limit: i64, discovery_pct: f64, scanning_pct: f64) -> Self {
        Self { store, monthly_limit, discovery_pct, scanning_pct }
    }

    fn current_month() -> YearMonth {
        YearMonth::current()
    }

    pub async fn status(&self) -> Result<TokenBudget> {
        let month = Self::current_month();
        Ok(self.store.get_or_create(&month, self.monthly_limit, self.discovery_pct, self.scanning_pct).await?)
    }

    /// True if `estimated_tokens` more spend would not push usage past the
    /// kind-specific allocation for the current month.
    pub async fn can_run(&self, estimated_tokens: i64, kind: SpendKind) -> Result<bool> {
        let budget = self.status().await?;
        let allocation_pct = match kind {
            SpendKind::Discovery => budget.discovery_allocation_percent,
            SpendKind::Scanning => budget.scanning_allocation_percent,
        };
        let allocated = (budget.monthly_limit as f64 * allocation_pct / 100.0) as i64;
        Ok(budget.tokens_used + estimated_tokens <= allocated)
    }

    /// The even daily share of what remains this month, based on calendar
    /// days left including today.
    pub async fn daily_budget(&self) -> Result<i64> {
        let budget = self.status().await?;
        let remaining = budget.tokens_remaining();
        let now = Utc::now();
        let days_in_month = days_in_month(now.year(), now.month());
        let days_left = (days_in_month - now.day() + 1).max(1) as i64;
        Ok(remaining / days_left)
    }

    /// Token cost of scanning `n` listings, per the catalog client's
    /// estimate for a basic-plus-history-plus-offers fetch.
    pub fn tokens_for_listings(&self, n: usize) -> f64 {
        crate::rate_limiter::estimate_fetch_cost(n, true, true)
    }

    pub async fn record_run(&self, tokens_used: i64, categories_scanned: i32, opportunities_found: i32) -> Result<TokenBudget> {
        let month = Self::current_month();
        self.store.get_or_create(&month, self.monthly_limit, self.discovery_pct, self.scanning_pct).await?;
        let budget = self.store.record_usage(&month, tokens_used).await?;
        self.store.record_run_outcome(&month, categories_scanned, opportunities_found).await?;
        Ok(budget)
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let first_of_next = chrono::NaiveDate::from_ymd_opt(next_year, next_month, 1).unwrap();
    let first_of_this = chrono::NaiveDate::from_ymd_opt(year, month, 1).unwrap();
    (first_of_next - first_of_this).num_days() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartacus_domain::store::InMemoryBudgetStore;

    fn manager() -> TokenBudgetManager {
        TokenBudgetManager::new(Arc::new(InMemoryBudgetStore::new()), 1_000_000, 20.0, 80.0)
    }

    #[tokio::test]
    async fn test_can_run_respects_allocation_split() {
        let mgr = manager();
        assert!(mgr.can_run(150_000, SpendKind::Discovery).await.unwrap());
        assert!(!mgr.can_run(250_000, SpendKind::Discovery).await.unwrap());
        assert!(mgr.can_run(700_000, SpendKind::Scanning).await.unwrap());
    }

    #[tokio::test]
    async fn test_record_run_updates_usage() {
        let mgr = manager();
        let budget = mgr.record_run(10_000, 3, 2).await.unwrap();
        assert_eq!(budget.tokens_used, 10_000);
        assert_eq!(budget.categories_scanned, 3);
        assert_eq!(budget.opportunities_found, 2);
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2026, 2), 28);
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2026, 12), 31);
    }

    #[test]
    fn test_tokens_for_listings() {
        let mgr = manager();
        assert_eq!(mgr.tokens_for_listings(10), 30.0);
    }
}
