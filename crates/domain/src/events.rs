//! Raw events derived from two adjacent snapshots (§3, §4.4). Immutable and
//! idempotent under `(listing_id, detected_at)` collision — the store's
//! unique-on-conflict-do-nothing rule is the source of truth (§5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_severity", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Price-event severity bands (§3): |Δ|≥5%→low, ≥10%→medium,
    /// ≥20%→high, ≥30%→critical.
    pub fn from_price_pct_change(pct_change: f64) -> Option<Severity> {
        let abs = pct_change.abs();
        if abs >= 30.0 {
            Some(Severity::Critical)
        } else if abs >= 20.0 {
            Some(Severity::High)
        } else if abs >= 10.0 {
            Some(Severity::Medium)
        } else if abs >= 5.0 {
            Some(Severity::Low)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "price_direction", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PriceDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "bsr_direction", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BsrDirection {
    /// Rank improved (went down numerically).
    Improving,
    Worsening,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "stock_event_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StockEventKind {
    Stockout,
    Restock,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PriceEvent {
    pub listing_id: String,
    pub detected_at: DateTime<Utc>,
    pub before_value: rust_decimal::Decimal,
    pub after_value: rust_decimal::Decimal,
    pub pct_change: f64,
    pub direction: PriceDirection,
    pub severity: Severity,
    pub before_snapshot_at: DateTime<Utc>,
    pub after_snapshot_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BsrEvent {
    pub listing_id: String,
    pub detected_at: DateTime<Utc>,
    pub before_value: i64,
    pub after_value: i64,
    pub pct_change: f64,
    pub direction: BsrDirection,
    pub severity: Severity,
    pub before_snapshot_at: DateTime<Utc>,
    pub after_snapshot_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StockEvent {
    pub listing_id: String,
    pub detected_at: DateTime<Utc>,
    pub kind: StockEventKind,
    pub severity: Severity,
    pub before_snapshot_at: DateTime<Utc>,
    pub after_snapshot_at: DateTime<Utc>,
}

/// All three event kinds produced by one pair of snapshots, so callers can
/// fan them out to the store without juggling three separate `Vec`s.
#[derive(Debug, Clone, Default)]
pub struct DetectedEvents {
    pub price_events: Vec<PriceEvent>,
    pub bsr_events: Vec<BsrEvent>,
    pub stock_events: Vec<StockEvent>,
}

impl DetectedEvents {
    pub fn is_empty(&self) -> bool {
        self.price_events.is_empty() && self.bsr_events.is_empty() && self.stock_events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_bands() {
        assert_eq!(Severity::from_price_pct_change(4.9), None);
        assert_eq!(Severity::from_price_pct_change(5.0), Some(Severity::Low));
        assert_eq!(Severity::from_price_pct_change(-10.0), Some(Severity::Medium));
        assert_eq!(Severity::from_price_pct_change(20.0), Some(Severity::High));
        assert_eq!(Severity::from_price_pct_change(-30.5), Some(Severity::Critical));
    }
}
