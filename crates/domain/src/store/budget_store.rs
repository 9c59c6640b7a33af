//! TokenBudget persistence (§4.2: one row per calendar month, lazily
//! created on first read within that month).

use crate::budget::TokenBudget;
use crate::error::Result;
use async_trait::async_trait;
use smartacus_core::types::YearMonth;
use smartacus_core::DatabasePool;

#[async_trait]
pub trait BudgetStore: Send + Sync {
    /// Creates the row with the given defaults if this is the first call for
    /// `month`, otherwise returns the existing row unmodified.
    async fn get_or_create(
        &self,
        month: &YearMonth,
        monthly_limit: i64,
        discovery_pct: f64,
        scanning_pct: f64,
    ) -> Result<TokenBudget>;
    async fn record_usage(&self, month: &YearMonth, tokens_used: i64) -> Result<TokenBudget>;
    async fn record_run_outcome(&self, month: &YearMonth, categories_scanned: i32, opportunities_found: i32) -> Result<()>;
}

pub struct PostgresBudgetStore {
    db: DatabasePool,
}

impl PostgresBudgetStore {
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }

    fn pool(&self) -> &sqlx::PgPool {
        self.db.handle()
    }
}

#[async_trait]
impl BudgetStore for PostgresBudgetStore {
    async fn get_or_create(
        &self,
        month: &YearMonth,
        monthly_limit: i64,
        discovery_pct: f64,
        scanning_pct: f64,
    ) -> Result<TokenBudget> {
        let budget = sqlx::query_as::<_, TokenBudget>(
            r#"
            INSERT INTO token_budgets (
                year_month, monthly_limit, tokens_used, discovery_allocation_percent,
                scanning_allocation_percent, runs_completed, categories_scanned, opportunities_found
            ) VALUES ($1, $2, 0, $3, $4, 0, 0, 0)
            ON CONFLICT (year_month) DO UPDATE SET year_month = EXCLUDED.year_month
            RETURNING *
            "#,
        )
        .bind(month.as_str())
        .bind(monthly_limit)
        .bind(discovery_pct)
        .bind(scanning_pct)
        .fetch_one(self.pool())
        .await?;
        Ok(budget)
    }

    async fn record_usage(&self, month: &YearMonth, tokens_used: i64) -> Result<TokenBudget> {
        let budget = sqlx::query_as::<_, TokenBudget>(
            r#"
            UPDATE token_budgets
            SET tokens_used = tokens_used + $2, runs_completed = runs_completed + 1
            WHERE year_month = $1
            RETURNING *
            "#,
        )
        .bind(month.as_str())
        .bind(tokens_used)
        .fetch_one(self.pool())
        .await?;
        Ok(budget)
    }

    async fn record_run_outcome(&self, month: &YearMonth, categories_scanned: i32, opportunities_found: i32) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE token_budgets
            SET categories_scanned = categories_scanned + $2, opportunities_found = opportunities_found + $3
            WHERE year_month = $1
            "#,
        )
        .bind(month.as_str())
        .bind(categories_scanned)
        .bind(opportunities_found)
        .execute(self.pool())
        .await?;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryBudgetStore {
    budgets: tokio::sync::Mutex<std::collections::HashMap<String, TokenBudget>>,
}

impl InMemoryBudgetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BudgetStore for InMemoryBudgetStore {
    async fn get_or_create(
        &self,
        month: &YearMonth,
        monthly_limit: i64,
        discovery_pct: f64,
        scanning_pct: f64,
    ) -> Result<TokenBudget> {
        let mut guard = self.budgets.lock().await;
        let entry = guard
            .entry(month.as_str().to_string())
            .or_insert_with(|| TokenBudget::new(month, monthly_limit, discovery_pct, scanning_pct));
        Ok(entry.clone())
    }

    async fn record_usage(&self, month: &YearMonth, tokens_used: i64) -> Result<TokenBudget> {
        let mut guard = self.budgets.lock().await;
        let entry = guard
            .get_mut(month.as_str())
            .ok_or_else(|| crate::error::DomainError::Invalid(format!("no budget row for {month}")))?;
        entry.tokens_used += tokens_used;
        entry.runs_completed += 1;
        Ok(entry.clone())
    }

    async fn record_run_outcome(&self, month: &YearMonth, categories_scanned: i32, opportunities_found: i32) -> Result<()> {
        let mut guard = self.budgets.lock().await;
        if let Some(entry) = guard.get_mut(month.as_str()) {
            entry.categories_scanned += categories_scanned;
            entry.opportunities_found += opportunities_found;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let store = InMemoryBudgetStore::new();
        let month = YearMonth("2026-07".to_string());
        let first = store.get_or_create(&month, 1_000_000, 20.0, 80.0).await.unwrap();
        store.record_usage(&month, 500).await.unwrap();
        let second = store.get_or_create(&month, 1_000_000, 20.0, 80.0).await.unwrap();
        assert_eq!(first.monthly_limit, second.monthly_limit);
        assert_eq!(second.tokens_used, 500);
    }
}
