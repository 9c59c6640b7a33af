//! AggregatedMetrics (§3): per-(listing, analysis-date) roll-up consumed by
//! the deterministic and economic scorers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AggregatedMetrics {
    pub listing_id: String,
    pub analysis_date: NaiveDate,
    pub stockout_count_90d: i32,
    /// Signed percent price change over the trailing 30 days.
    pub price_trend_30d: f64,
    pub seller_churn_90d: i32,
    /// Second derivative of BSR over the trailing window; positive means
    /// rank is worsening at an increasing rate.
    pub bsr_acceleration: f64,
    pub bsr_trend_7d: f64,
    pub bsr_trend_30d: f64,
    pub event_counts_by_kind: serde_json::Value,
    pub last_price_drop_at: Option<DateTime<Utc>>,
    pub last_stockout_at: Option<DateTime<Utc>>,
    pub avg_price_volatility: f64,
}

impl AggregatedMetrics {
    pub fn event_count(&self, kind: &str) -> i64 {
        self.event_counts_by_kind.get(kind).and_then(|v| v.as_i64()).unwrap_or(0)
    }

    /// Monthly stockout frequency used by the economic scorer's
    /// time-multiplier (§4.7): 90-day count scaled to a 30-day rate.
    pub fn stockout_frequency_per_month(&self) -> f64 {
        self.stockout_count_90d as f64 / 3.0
    }

    /// Seller churn expressed as a 0..1 fraction used by the economic
    /// scorer's time-multiplier band.
    pub fn seller_churn_fraction(&self, current_seller_count: i32) -> f64 {
        if current_seller_count <= 0 {
            return 0.0;
        }
        (self.seller_churn_90d as f64 / current_seller_count as f64).min(1.0)
    }
}
