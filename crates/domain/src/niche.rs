//! Niche (§3): a category-registry entry used by the strategy agent to
//! scope scans. Keyed by `(category_id, marketplace_domain)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Niche {
    pub category_id: String,
    pub marketplace_domain: i32,
    pub name: String,
    pub path: serde_json::Value,
    pub priority: i32,
    pub is_active: bool,
    pub total_runs: i32,
    pub total_opportunities_found: i32,
    pub conversion_rate: f64,
    pub last_scanned_at: Option<DateTime<Utc>>,
}

impl Niche {
    pub fn days_since_last_scan(&self, now: DateTime<Utc>) -> f64 {
        match self.last_scanned_at {
            Some(ts) => (now - ts).num_seconds() as f64 / 86_400.0,
            None => f64::INFINITY,
        }
    }
}

/// Historical per-cycle outcome appended to a niche's performance-history
/// table (§6), read back by the strategy agent to compute momentum.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NichePerformanceRecord {
    pub category_id: String,
    pub marketplace_domain: i32,
    pub cycle_id: i64,
    pub recorded_at: DateTime<Utc>,
    pub tokens_used: i64,
    pub opportunities_found: i32,
    pub avg_opportunity_score: f64,
    pub conversion_rate: f64,
}
