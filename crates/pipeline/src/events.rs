//! Event detector (§4.4, C4): diffs each listing's two most recent
//! snapshots into price/BSR/stock events and rolls the result up into
//! [`AggregatedMetrics`]. Idempotent per analysis-date — the store's
//! unique-on-conflict-do-nothing rule on `(listing_id, detected_at)` is the
//! actual source of truth (§5); this module only decides *whether* an event
//! fired, not whether it persists.

use chrono::{NaiveDate, Utc};
use smartacus_domain::{
    AggregatedMetrics, BsrDirection, BsrEvent, DetectedEvents, PriceDirection, PriceEvent, Severity, Snapshot,
    StockEvent, StockEventKind, StockStatus,
};

/// Compares `previous` (older) against `current` (newer) and returns every
/// event the pair triggers (§4.4's condition table).
pub fn detect_events(previous: &Snapshot, current: &Snapshot) -> DetectedEvents {
    let mut out = DetectedEvents::default();

    if let Some(pct) = current.price_pct_change(previous) {
        if pct <= -10.0 || pct >= 10.0 {
            if let Some(severity) = Severity::from_price_pct_change(pct) {
                out.price_events.push(PriceEvent {
                    listing_id: current.listing_id.clone(),
                    detected_at: current.captured_at,
                    before_value: previous.current_price,
                    after_value: current.current_price,
                    pct_change: pct,
                    direction: if pct < 0.0 { PriceDirection::Down } else { PriceDirection::Up },
                    severity,
                    before_snapshot_at: previous.captured_at,
                    after_snapshot_at: current.captured_at,
                });
            }
        }
    }

    if let (Some(before), Some(after)) = (previous.bsr, current.bsr) {
        if before > 0 {
            let pct = (after - before) as f64 / before as f64 * 100.0;
            let abs_delta = (after - before).abs();
            if pct <= -20.0 || pct >= 20.0 || abs_delta >= 10_000 {
                let severity = bsr_severity(pct, abs_delta);
                out.bsr_events.push(BsrEvent {
                    listing_id: current.listing_id.clone(),
                    detected_at: current.captured_at,
                    before_value: before,
                    after_value: after,
                    pct_change: pct,
                    direction: if pct < 0.0 { BsrDirection::Improving } else { BsrDirection::Worsening },
                    severity,
                    before_snapshot_at: previous.captured_at,
                    after_snapshot_at: current.captured_at,
                });
            }
        }
    }

    match (previous.stock_status, current.stock_status) {
        (prev, StockStatus::OutOfStock) if prev != StockStatus::OutOfStock => {
            out.stock_events.push(StockEvent {
                listing_id: current.listing_id.clone(),
                detected_at: current.captured_at,
                kind: StockEventKind::Stockout,
                severity: Severity::High,
                before_snapshot_at: previous.captured_at,
                after_snapshot_at: current.captured_at,
            });
        }
        (StockStatus::OutOfStock, now) if now != StockStatus::OutOfStock => {
            out.stock_events.push(StockEvent {
                listing_id: current.listing_id.clone(),
                detected_at: current.captured_at,
                kind: StockEventKind::Restock,
                severity: Severity::Medium,
                before_snapshot_at: previous.captured_at,
                after_snapshot_at: current.captured_at,
            });
        }
        _ => {}
    }

    out
}

fn bsr_severity(pct: f64, abs_delta: i64) -> Severity {
    Severity::from_price_pct_change(pct).unwrap_or_else(|| {
        if abs_delta >= 50_000 {
            Severity::Critical
        } else if abs_delta >= 25_000 {
            Severity::High
        } else {
            Severity::Low
        }
    })
}

/// Rolls a 90-day snapshot history plus the just-detected events into the
/// day's [`AggregatedMetrics`] row (§3, §4.4).
pub fn aggregate_metrics(listing_id: &str, analysis_date: NaiveDate, history: &[Snapshot], events: &DetectedEvents) -> AggregatedMetrics {
    let stockout_count_90d = events.stock_events.iter().filter(|e| e.kind == StockEventKind::Stockout).count() as i32
        + history.windows(2).filter(|w| w[0].stock_status != StockStatus::OutOfStock && w[1].stock_status == StockStatus::OutOfStock).count() as i32;

    let price_trend_30d = trend_pct(history, 30);
    let bsr_trend_7d = bsr_trend_pct(history, 7);
    let bsr_trend_30d = bsr_trend_pct(history, 30);
    let bsr_acceleration = bsr_trend_7d - bsr_trend_30d / 30.0 * 7.0;

    let seller_churn_90d = history
        .windows(2)
        .map(|w| (w[1].seller_count - w[0].seller_count).unsigned_abs() as i32)
        .sum();

    let avg_price_volatility = {
        let changes: Vec<f64> = history.windows(2).filter_map(|w| w[1].price_pct_change(&w[0])).collect();
        if changes.is_empty() {
            0.0
        } else {
            let mean = changes.iter().sum::<f64>() / changes.len() as f64;
            (changes.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / changes.len() as f64).sqrt() / 100.0
        }
    };

    let last_price_drop_at = events.price_events.iter().filter(|e| e.direction == PriceDirection::Down).map(|e| e.detected_at).max();
    let last_stockout_at = events.stock_events.iter().filter(|e| e.kind == StockEventKind::Stockout).map(|e| e.detected_at).max();

    AggregatedMetrics {
        listing_id: listing_id.to_string(),
        analysis_date,
        stockout_count_90d,
        price_trend_30d,
        seller_churn_90d,
        bsr_acceleration,
        bsr_trend_7d,
        bsr_trend_30d,
        event_counts_by_kind: serde_json::json!({
            "price": events.price_events.len(),
            "bsr": events.bsr_events.len(),
            "stock": events.stock_events.len(),
        }),
        last_price_drop_at,
        last_stockout_at,
        avg_price_volatility,
    }
}

fn trend_pct(history: &[Snapshot], days: i64) -> f64 {
    let cutoff = Utc::now() - chrono::Duration::days(days);
    let window: Vec<&Snapshot> = history.iter().filter(|s| s.captured_at >= cutoff).collect();
    match (window.first(), window.last()) {
        (Some(first), Some(last)) if first.current_price > rust_decimal::Decimal::ZERO => {
            use rust_decimal::prelude::ToPrimitive;
            ((last.current_price - first.current_price) / first.current_price * rust_decimal::Decimal::from(100))
                .to_f64()
                .unwrap_or(0.0)
        }
        _ => 0.0,
    }
}

fn bsr_trend_pct(history: &[Snapshot], days: i64) -> f64 {
    let cutoff = Utc::now() - chrono::Duration::days(days);
    let window: Vec<&Snapshot> = history.iter().filter(|s| s.captured_at >= cutoff).collect();
    match (window.first().and_then(|s| s.bsr), window.last().and_then(|s| s.bsr)) {
        (Some(first), Some(last)) if first > 0 => (last - first) as f64 / first as f64 * 100.0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(price: &str, bsr: Option<i64>, stock: StockStatus, seller_count: i32) -> Snapshot {
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
            fulfillment_type: smartacus_domain::FulfillmentType::Platform,
            seller_count,
            rating_average: None,
            review_count: 0,
            rating_histogram: None,
            ingestion_session_id: "s1".to_string(),
        }
    }

    #[test]
    fn test_price_drop_emits_event() {
        let before = snap("30.00", Some(1000), StockStatus::InStock, 3);
        let after = snap("26.00", Some(1000), StockStatus::InStock, 3);
        let events = detect_events(&before, &after);
        assert_eq!(events.price_events.len(), 1);
        assert_eq!(events.price_events[0].direction, PriceDirection::Down);
    }

    #[test]
    fn test_stockout_then_restock() {
        let in_stock = snap("10.00", None, StockStatus::InStock, 2);
        let out_of_stock = snap("10.00", None, StockStatus::OutOfStock, 2);
        let stockout = detect_events(&in_stock, &out_of_stock);
        assert_eq!(stockout.stock_events.len(), 1);
        assert_eq!(stockout.stock_events[0].kind, StockEventKind::Stockout);

        let restock = detect_events(&out_of_stock, &in_stock);
        assert_eq!(restock.stock_events[0].kind, StockEventKind::Restock);
    }

    #[test]
    fn test_bsr_improvement_event() {
        let before = snap("10.00", Some(10_000), StockStatus::InStock, 2);
        let after = snap("10.00", Some(7_000), StockStatus::InStock, 2);
        let events = detect_events(&before, &after);
        assert_eq!(events.bsr_events.len(), 1);
        assert_eq!(events.bsr_events[0].direction, BsrDirection::Improving);
    }

    #[test]
    fn test_small_changes_produce_no_events() {
        let before = snap("10.00", Some(10_000), StockStatus::InStock, 2);
        let after = snap("10.20", Some(10_100), StockStatus::InStock, 2);
        let events = detect_events(&before, &after);
        assert!(events.is_empty());
    }
}
