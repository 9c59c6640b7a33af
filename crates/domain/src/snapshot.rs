//! Snapshot entity (§3): a point-in-time observation of a listing.
//! Snapshots are append-only and never mutated after insert; uniqueness is
//! `(listing_id, captured_at)`.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "stock_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
    BackOrdered,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "fulfillment_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentType {
    Platform,
    PlatformFulfilled,
    MerchantFulfilled,
    Unknown,
}

/// Five-bucket rating histogram (1-star through 5-star), each a fraction of
/// total ratings. Sums to 1.0 ± ε when present (§3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RatingHistogram {
    pub one_star: f64,
    pub two_star: f64,
    pub three_star: f64,
    pub four_star: f64,
    pub five_star: f64,
}

impl RatingHistogram {
    pub fn sum(&self) -> f64 {
        self.one_star + self.two_star + self.three_star + self.four_star + self.five_star
    }

    pub fn is_normalized(&self, epsilon: f64) -> bool {
        (self.sum() - 1.0).abs() <= epsilon
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Snapshot {
    pub listing_id: String,
    pub captured_at: DateTime<Utc>,
    pub current_price: Decimal,
    pub list_price: Option<Decimal>,
    pub lowest_new: Option<Decimal>,
    pub lowest_used: Option<Decimal>,
    pub currency: String,
    pub bsr: Option<i64>,
    pub bsr_category: Option<String>,
    pub stock_status: StockStatus,
    pub fulfillment_type: FulfillmentType,
    pub seller_count: i32,
    pub rating_average: Option<Decimal>,
    pub review_count: i32,
    /// Encoded as JSON `{one,two,three,four,five}`; present only when the
    /// provider returned a histogram.
    pub rating_histogram: Option<serde_json::Value>,
    pub ingestion_session_id: String,
}

impl Snapshot {
    pub fn rating_histogram_typed(&self) -> Option<RatingHistogram> {
        self.rating_histogram
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Percent change in `current_price` between `self` (after) and
    /// `previous` (before), signed: negative means a price drop.
    pub fn price_pct_change(&self, previous: &Snapshot) -> Option<f64> {
        if previous.current_price.is_zero() {
            return None;
        }
        let delta = self.current_price - previous.current_price;
        (delta / previous.current_price * Decimal::from(100)).to_f64()
    }

    /// Percent change in BSR. `None` when either value is missing or the
    /// previous BSR was non-positive (rank is undefined at 0).
    pub fn bsr_pct_change(&self, previous: &Snapshot) -> Option<f64> {
        match (self.bsr, previous.bsr) {
            (Some(now), Some(before)) if before > 0 => {
                Some((now - before) as f64 / before as f64 * 100.0)
            }
            _ => None,
        }
    }
}

/// A single (timestamp, value) history point with an optional flag set.
/// The "no data" sentinel (-1 in the upstream provider's wire format) is
/// never represented here — it is filtered out during transform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(price: &str, bsr: Option<i64>, stock: StockStatus) -> Snapshot {
        Snapshot {
            listing_id: "L1".to_string(),
            captured_at: Utc::now(),
            current_price: price.parse().unwrap(),
            list_price: None,
            lowest_new: None,
            lowest_used: None,
            currency: "USD".to_string(),
            bsr,
            bsr_category: None,
            stock_status: stock,
            fulfillment_type: FulfillmentType::Platform,
            seller_count: 1,
            rating_average: None,
            review_count: 0,
            rating_histogram: None,
            ingestion_session_id: "s1".to_string(),
        }
    }

    #[test]
    fn test_price_pct_change_drop() {
        let before = snap("30.00", None, StockStatus::InStock);
        let after = snap("27.00", None, StockStatus::InStock);
        let pct = after.price_pct_change(&before).unwrap();
        assert!((pct - (-10.0)).abs() < 0.001);
    }

    #[test]
    fn test_bsr_pct_change_requires_positive_previous() {
        let before = snap("30.00", Some(0), StockStatus::InStock);
        let after = snap("30.00", Some(100), StockStatus::InStock);
        assert!(after.bsr_pct_change(&before).is_none());
    }

    #[test]
    fn test_rating_histogram_normalized() {
        let hist = RatingHistogram {
            one_star: 0.05,
            two_star: 0.05,
            three_star: 0.1,
            four_star: 0.3,
            five_star: 0.5,
        };
        assert!(hist.is_normalized(1e-6));
    }
}
