//! EconomicOpportunity persistence and the shortlist query (C8) that reads
//! it back ordered by `rank_score`.

use crate::error::Result;
use crate::opportunity::EconomicOpportunity;
use async_trait::async_trait;
use rust_decimal::Decimal;
use smartacus_core::{DatabasePool, PaginationOptions, PaginationResult};
use sqlx::Row;

#[async_trait]
pub trait OpportunityStore: Send + Sync {
    async fn insert_opportunity(&self, opportunity: &EconomicOpportunity) -> Result<()>;
    async fn shortlist(
        &self,
        min_score: f64,
        min_value: Decimal,
        pagination: PaginationOptions,
    ) -> Result<PaginationResult<EconomicOpportunity>>;
}

pub struct PostgresOpportunityStore {
    db: DatabasePool,
}

impl PostgresOpportunityStore {
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }

    fn pool(&self) -> &sqlx::PgPool {
        self.db.handle()
    }
}

#[async_trait]
impl OpportunityStore for PostgresOpportunityStore {
    async fn insert_opportunity(&self, opportunity: &EconomicOpportunity) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO economic_opportunities (
                listing_id, detected_at, base_score, time_multiplier, final_score,
                estimated_monthly_profit, estimated_annual_value, risk_adjusted_value,
                window_class, window_days, thesis, rank_score
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (listing_id, detected_at) DO UPDATE SET
                base_score = EXCLUDED.base_score,
                time_multiplier = EXCLUDED.time_multiplier,
                final_score = EXCLUDED.final_score,
                estimated_monthly_profit = EXCLUDED.estimated_monthly_profit,
                estimated_annual_value = EXCLUDED.estimated_annual_value,
                risk_adjusted_value = EXCLUDED.risk_adjusted_value,
                window_class = EXCLUDED.window_class,
                window_days = EXCLUDED.window_days,
                thesis = EXCLUDED.thesis,
                rank_score = EXCLUDED.rank_score
            "#,
        )
        .bind(&opportunity.listing_id)
        .bind(opportunity.detected_at)
        .bind(opportunity.base_score)
        .bind(opportunity.time_multiplier)
        .bind(opportunity.final_score)
        .bind(opportunity.estimated_monthly_profit)
        .bind(opportunity.estimated_annual_value)
        .bind(opportunity.risk_adjusted_value)
        .bind(opportunity.window_class)
        .bind(opportunity.window_days)
        .bind(&opportunity.thesis)
        .bind(opportunity.rank_score)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn shortlist(
        &self,
        min_score: f64,
        min_value: Decimal,
        pagination: PaginationOptions,
    ) -> Result<PaginationResult<EconomicOpportunity>> {
        let offset = (pagination.page - 1).max(0) * pagination.limit;
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM economic_opportunities WHERE final_score >= $1 AND risk_adjusted_value >= $2",
        )
        .bind(min_score)
        .bind(min_value)
        .fetch_one(self.pool())
        .await?;

        let rows = sqlx::query(
            r#"
            SELECT * FROM economic_opportunities
            WHERE final_score >= $1 AND risk_adjusted_value >= $2
            ORDER BY rank_score DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(min_score)
        .bind(min_value)
        .bind(pagination.limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;

        let items = rows
            .into_iter()
            .map(|row| EconomicOpportunity {
                listing_id: row.get("listing_id"),
                detected_at: row.get("detected_at"),
                base_score: row.get("base_score"),
                time_multiplier: row.get("time_multiplier"),
                final_score: row.get("final_score"),
                estimated_monthly_profit: row.get("estimated_monthly_profit"),
                estimated_annual_value: row.get("estimated_annual_value"),
                risk_adjusted_value: row.get("risk_adjusted_value"),
                window_class: row.get("window_class"),
                window_days: row.get("window_days"),
                thesis: row.get("thesis"),
                rank_score: row.get("rank_score"),
            })
            .collect();

        Ok(PaginationResult::new(items, total, pagination))
    }
}

#[derive(Default)]
pub struct InMemoryOpportunityStore {
    opportunities: tokio::sync::Mutex<Vec<EconomicOpportunity>>,
}

impl InMemoryOpportunityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OpportunityStore for InMemoryOpportunityStore {
    async fn insert_opportunity(&self, opportunity: &EconomicOpportunity) -> Result<()> {
        let mut guard = self.opportunities.lock().await;
        guard.retain(|o| !(o.listing_id == opportunity.listing_id && o.detected_at == opportunity.detected_at));
        guard.push(opportunity.clone());
        Ok(())
    }

    async fn shortlist(
        &self,
        min_score: f64,
        min_value: Decimal,
        pagination: PaginationOptions,
    ) -> Result<PaginationResult<EconomicOpportunity>> {
        let guard = self.opportunities.lock().await;
        let mut matches: Vec<EconomicOpportunity> = guard
            .iter()
            .filter(|o| o.passes_shortlist_filters(min_score, min_value))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.rank_score.partial_cmp(&a.rank_score).unwrap_or(std::cmp::Ordering::Equal));
        let total = matches.len() as i64;
        let offset = ((pagination.page - 1).max(0) * pagination.limit) as usize;
        let page_items = matches.into_iter().skip(offset).take(pagination.limit as usize).collect();
        Ok(PaginationResult::new(page_items, total, pagination))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opportunity::WindowClass;
    use chrono::Utc;

    fn opportunity(id: &str, score: f64) -> EconomicOpportunity {
        EconomicOpportunity {
            listing_id: id.to_string(),
            detected_at: Utc::now(),
            base_score: score,
            time_multiplier: 1.0,
            final_score: score,
            estimated_monthly_profit: "500".parse().unwrap(),
            estimated_annual_value: "6000".parse().unwrap(),
            risk_adjusted_value: "4000".parse().unwrap(),
            window_class: WindowClass::Active,
            window_days: 30,
            thesis: "t".to_string(),
            rank_score: score,
        }
    }

    #[tokio::test]
    async fn test_shortlist_orders_by_rank_score_desc() {
        let store = InMemoryOpportunityStore::new();
        store.insert_opportunity(&opportunity("L1", 50.0)).await.unwrap();
        store.insert_opportunity(&opportunity("L2", 90.0)).await.unwrap();
        let result = store
            .shortlist(0.0, "0".parse().unwrap(), PaginationOptions::default())
            .await
            .unwrap();
        assert_eq!(result.items[0].listing_id, "L2");
        assert_eq!(result.total, 2);
    }

    #[tokio::test]
    async fn test_shortlist_filters_below_min_score() {
        let store = InMemoryOpportunityStore::new();
        store.insert_opportunity(&opportunity("L1", 10.0)).await.unwrap();
        let result = store
            .shortlist(50.0, "0".parse().unwrap(), PaginationOptions::default())
            .await
            .unwrap();
        assert!(result.items.is_empty());
    }
}
