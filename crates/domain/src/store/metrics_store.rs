//! AggregatedMetrics persistence. One row per `(listing_id, analysis_date)`,
//! upserted by the aggregation step that feeds both scorers.

use crate::error::Result;
use crate::metrics::AggregatedMetrics;
use async_trait::async_trait;
use chrono::NaiveDate;
use smartacus_core::DatabasePool;

#[async_trait]
pub trait MetricsStore: Send + Sync {
    async fn upsert_metrics(&self, metrics: &AggregatedMetrics) -> Result<()>;
    async fn get_metrics(&self, listing_id: &str, analysis_date: NaiveDate) -> Result<Option<AggregatedMetrics>>;
}

pub struct PostgresMetricsStore {
    db: DatabasePool,
}

impl PostgresMetricsStore {
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }

    fn pool(&self) -> &sqlx::PgPool {
        self.db.handle()
    }
}

#[async_trait]
impl MetricsStore for PostgresMetricsStore {
    async fn upsert_metrics(&self, metrics: &AggregatedMetrics) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO aggregated_metrics (
                listing_id, analysis_date, stockout_count_90d, price_trend_30d,
                seller_churn_90d, bsr_acceleration, bsr_trend_7d, bsr_trend_30d,
                event_counts_by_kind, last_price_drop_at, last_stockout_at, avg_price_volatility
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (listing_id, analysis_date) DO UPDATE SET
                stockout_count_90d = EXCLUDED.stockout_count_90d,
                price_trend_30d = EXCLUDED.price_trend_30d,
                seller_churn_90d = EXCLUDED.seller_churn_90d,
                bsr_acceleration = EXCLUDED.bsr_acceleration,
                bsr_trend_7d = EXCLUDED.bsr_trend_7d,
                bsr_trend_30d = EXCLUDED.bsr_trend_30d,
                event_counts_by_kind = EXCLUDED.event_counts_by_kind,
                last_price_drop_at = EXCLUDED.last_price_drop_at,
                last_stockout_at = EXCLUDED.last_stockout_at,
                avg_price_volatility = EXCLUDED.avg_price_volatility
            "#,
        )
        .bind(&metrics.listing_id)
        .bind(metrics.analysis_date)
        .bind(metrics.stockout_count_90d)
        .bind(metrics.price_trend_30d)
        .bind(metrics.seller_churn_90d)
        .bind(metrics.bsr_acceleration)
        .bind(metrics.bsr_trend_7d)
        .bind(metrics.bsr_trend_30d)
        .bind(&metrics.event_counts_by_kind)
        .bind(metrics.last_price_drop_at)
        .bind(metrics.last_stockout_at)
        .bind(metrics.avg_price_volatility)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn get_metrics(&self, listing_id: &str, analysis_date: NaiveDate) -> Result<Option<AggregatedMetrics>> {
        let metrics = sqlx::query_as::<_, AggregatedMetrics>(
            "SELECT * FROM aggregated_metrics WHERE listing_id = $1 AND analysis_date = $2",
        )
        .bind(listing_id)
        .bind(analysis_date)
        .fetch_optional(self.pool())
        .await?;
        Ok(metrics)
    }
}

#[derive(Default)]
pub struct InMemoryMetricsStore {
    rows: tokio::sync::Mutex<std::collections::HashMap<(String, NaiveDate), AggregatedMetrics>>,
}

impl InMemoryMetricsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetricsStore for InMemoryMetricsStore {
    async fn upsert_metrics(&self, metrics: &AggregatedMetrics) -> Result<()> {
        self.rows
            .lock()
            .await
            .insert((metrics.listing_id.clone(), metrics.analysis_date), metrics.clone());
        Ok(())
    }

    async fn get_metrics(&self, listing_id: &str, analysis_date: NaiveDate) -> Result<Option<AggregatedMetrics>> {
        Ok(self.rows.lock().await.get(&(listing_id.to_string(), analysis_date)).cloned())
    }
}
