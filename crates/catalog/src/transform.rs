//! Pure transform functions from the remote provider's raw wire shapes into
//! typed domain values (§4.1 "Output transform"). Independently testable
//! without any network access.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use smartacus_domain::HistoryPoint;

/// The provider's history timestamps are minutes since this fixed epoch
/// (2011-01-01T00:00:00Z), not Unix epoch.
pub const HISTORY_EPOCH_MINUTES: i64 = 1_293_840_000 / 60;

/// Converts a provider-relative minute offset into an absolute UTC instant.
pub fn minutes_to_utc(minutes_since_epoch: i64) -> DateTime<Utc> {
    let unix_seconds = (HISTORY_EPOCH_MINUTES + minutes_since_epoch) * 60;
    Utc.timestamp_opt(unix_seconds, 0).single().unwrap_or_else(Utc::now)
}

/// Parses a flat `[timestamp, value, timestamp, value, ...]` history array
/// into typed points, skipping the provider's "no data" sentinel (-1).
pub fn parse_history_points(flat: &[i64]) -> Vec<HistoryPoint> {
    flat.chunks_exact(2)
        .filter(|pair| pair[1] != -1)
        .map(|pair| HistoryPoint { timestamp: minutes_to_utc(pair[0]), value: pair[1] as f64 })
        .collect()
}

/// Converts an integer cents value into a two-decimal `Decimal`. Returns
/// `None` for the provider's "no data" sentinel (-1).
pub fn cents_to_decimal(cents: i64) -> Option<Decimal> {
    if cents < 0 {
        return None;
    }
    Some(Decimal::new(cents, 2))
}

/// Rating is stored ×10 upstream (e.g. 45 means 4.5 stars); divide on
/// ingest. Returns `None` for the "no data" sentinel.
pub fn rating_from_tenths(tenths: i64) -> Option<Decimal> {
    if tenths < 0 {
        return None;
    }
    Some(Decimal::new(tenths, 1))
}

/// Current-price priority (§4.1): buy-box-new, then primary listing price,
/// then plain new-condition price — first present value wins.
pub fn pick_current_price(buybox_new: Option<i64>, primary: Option<i64>, new: Option<i64>) -> Option<i64> {
    buybox_new.or(primary).or(new).filter(|&c| c >= 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_history_points_skips_sentinel() {
        let flat = vec![0, 100, 60, -1, 120, 200];
        let points = parse_history_points(&flat);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].value, 100.0);
        assert_eq!(points[1].value, 200.0);
    }

    #[test]
    fn test_cents_to_decimal() {
        assert_eq!(cents_to_decimal(1999), Some(Decimal::new(1999, 2)));
        assert_eq!(cents_to_decimal(-1), None);
    }

    #[test]
    fn test_rating_from_tenths() {
        assert_eq!(rating_from_tenths(45), Some(Decimal::new(45, 1)));
        assert_eq!(rating_from_tenths(-1), None);
    }

    #[test]
    fn test_pick_current_price_priority() {
        assert_eq!(pick_current_price(Some(1000), Some(2000), Some(3000)), Some(1000));
        assert_eq!(pick_current_price(None, Some(2000), Some(3000)), Some(2000));
        assert_eq!(pick_current_price(None, None, Some(3000)), Some(3000));
        assert_eq!(pick_current_price(None, None, None), None);
    }

    #[test]
    fn test_minutes_to_utc_is_after_epoch() {
        let instant = minutes_to_utc(0);
        assert_eq!(instant.timestamp(), HISTORY_EPOCH_MINUTES * 60);
    }
}
