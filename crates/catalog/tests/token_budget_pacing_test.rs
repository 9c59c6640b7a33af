//! Daily pacing math for the monthly token budget (§4.2, S4): the daily
//! share is the remaining allowance spread evenly over the calendar days
//! left in the month, including today.

use chrono::{Datelike, Utc};
use smartacus_catalog::TokenBudgetManager;
use smartacus_domain::store::InMemoryBudgetStore;
use std::sync::Arc;

fn days_left_in_month_including_today(now: chrono::DateTime<Utc>) -> i64 {
    let (next_year, next_month) = if now.month() == 12 { (now.year() + 1, 1) } else { (now.year(), now.month() + 1) };
    let first_of_next = chrono::NaiveDate::from_ymd_opt(next_year, next_month, 1).unwrap();
    let first_of_this_month = chrono::NaiveDate::from_ymd_opt(now.year(), now.month(), 1).unwrap();
    let days_in_month = (first_of_next - first_of_this_month).num_days();
    (days_in_month - now.day() as i64 + 1).max(1)
}

#[tokio::test]
async fn daily_budget_spreads_remaining_allowance_over_days_left() {
    let store = Arc::new(InMemoryBudgetStore::new());
    let manager = TokenBudgetManager::new(store, 900_000, 20.0, 80.0);

    manager.record_run(300_000, 0, 0).await.unwrap();

    let now = Utc::now();
    let expected_days_left = days_left_in_month_including_today(now);
    let expected_daily_budget = (900_000 - 300_000) / expected_days_left;

    let daily_budget = manager.daily_budget().await.unwrap();
    assert_eq!(daily_budget, expected_daily_budget);

    let status = manager.status().await.unwrap();
    assert_eq!(status.tokens_remaining(), 600_000);
}

#[tokio::test]
async fn skips_cycle_when_remaining_below_minimum_per_run() {
    let store = Arc::new(InMemoryBudgetStore::new());
    let manager = TokenBudgetManager::new(store, 900_000, 20.0, 80.0);
    manager.record_run(899_980, 0, 0).await.unwrap();

    let status = manager.status().await.unwrap();
    assert!(status.tokens_remaining() < 50, "remaining should have dropped below a typical min-tokens-per-run floor");
}
