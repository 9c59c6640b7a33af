//! Economic-event synthesizer (§4.5, C5). Each builder follows the same
//! contract: given a signal bundle, return an event iff its creation
//! conditions are met. Builders never raise; "no event" is a `None`.

use chrono::{DateTime, Utc};
use smartacus_domain::{AggregatedMetrics, Confidence, EconomicEvent, EconomicEventType, Snapshot, Urgency};

/// Everything a builder needs about one listing's current state — raw
/// metrics plus a couple of caller-supplied facts the core doesn't compute
/// itself (§4.12 Open Questions: competitor stockouts are out of scope for
/// the core and are supplied by callers).
pub struct SignalBundle<'a> {
    pub listing_id: &'a str,
    pub detected_at: DateTime<Utc>,
    pub metrics: &'a AggregatedMetrics,
    pub current_snapshot: &'a Snapshot,
    pub competitor_out_of_stock: bool,
}

fn urgency_from_frequency(freq_per_month: f64) -> Urgency {
    if freq_per_month >= 3.0 {
        Urgency::Critical
    } else if freq_per_month >= 1.0 {
        Urgency::High
    } else if freq_per_month >= 0.5 {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

fn build(
    listing_id: &str,
    detected_at: DateTime<Utc>,
    event_type: EconomicEventType,
    thesis: String,
    urgency: Urgency,
    estimated_window_days: i32,
    supporting: Vec<String>,
    contradicting: Vec<String>,
) -> Option<EconomicEvent> {
    if supporting.len() < 2 {
        return None;
    }
    let confidence = Confidence::from_signal_count(supporting.len(), contradicting.len());
    Some(EconomicEvent {
        listing_id: listing_id.to_string(),
        detected_at,
        event_type,
        thesis,
        confidence,
        urgency,
        estimated_window_days,
        supporting_signals: serde_json::json!(supporting),
        contradicting_signals: serde_json::json!(contradicting),
        opportunity_value: None,
    })
}

/// At least two of {stockouts-90d ≥ 2, BSR improvement > 20%, non-negative
/// price trend, ≥1 competitor also out-of-stock} (§4.5 example).
pub fn supply_shock(s: &SignalBundle) -> Option<EconomicEvent> {
    let mut supporting = Vec::new();
    let mut contradicting = Vec::new();

    if s.metrics.stockout_count_90d >= 2 {
        supporting.push(format!("stockouts_90d={}", s.metrics.stockout_count_90d));
    } else {
        contradicting.push("insufficient stockout history".to_string());
    }
    if s.metrics.bsr_trend_30d <= -20.0 {
        supporting.push(format!("bsr_improvement_30d={:.1}%", s.metrics.bsr_trend_30d));
    }
    if s.metrics.price_trend_30d >= 0.0 {
        supporting.push(format!("price_trend_30d={:.1}%", s.metrics.price_trend_30d));
    } else {
        contradicting.push("price trend negative".to_string());
    }
    if s.competitor_out_of_stock {
        supporting.push("competitor_out_of_stock".to_string());
    }

    let urgency = urgency_from_frequency(s.metrics.stockout_frequency_per_month());
    build(
        s.listing_id,
        s.detected_at,
        EconomicEventType::SupplyShock,
        "Supply constrained: recurring stockouts with improving demand signals".to_string(),
        urgency,
        30,
        supporting,
        contradicting,
    )
}

/// High seller churn plus improving (or at least stable) BSR with no price
/// collapse suggests competitors are exiting the listing.
pub fn competitor_collapse(s: &SignalBundle) -> Option<EconomicEvent> {
    let mut supporting = Vec::new();
    let mut contradicting = Vec::new();
    let churn_fraction = s.metrics.seller_churn_fraction(s.current_snapshot.seller_count);

    if churn_fraction > 0.20 {
        supporting.push(format!("seller_churn_fraction={:.2}", churn_fraction));
    } else {
        contradicting.push("seller churn below threshold".to_string());
    }
    if s.metrics.bsr_trend_30d <= 0.0 {
        supporting.push(format!("bsr_trend_30d={:.1}%", s.metrics.bsr_trend_30d));
    }
    if s.current_snapshot.seller_count <= 2 {
        supporting.push(format!("seller_count={}", s.current_snapshot.seller_count));
    }

    build(
        s.listing_id,
        s.detected_at,
        EconomicEventType::CompetitorCollapse,
        "Competitor exit: seller count dropping while demand holds".to_string(),
        Urgency::Medium,
        45,
        supporting,
        contradicting,
    )
}

/// Worsening BSR combined with a negative price trend suggests quality
/// decay rather than pure demand weakness.
pub fn quality_decay(s: &SignalBundle) -> Option<EconomicEvent> {
    let mut supporting = Vec::new();
    let mut contradicting = Vec::new();

    if s.metrics.bsr_trend_30d > 20.0 {
        supporting.push(format!("bsr_worsening_30d={:.1}%", s.metrics.bsr_trend_30d));
    } else {
        contradicting.push("BSR not meaningfully worsening".to_string());
    }
    if s.metrics.price_trend_30d < 0.0 {
        supporting.push(format!("price_trend_30d={:.1}%", s.metrics.price_trend_30d));
    }
    if s.current_snapshot.rating_average.map(|r| r < rust_decimal::Decimal::new(40, 1)).unwrap_or(false) {
        supporting.push("rating_below_4_0".to_string());
    }

    build(
        s.listing_id,
        s.detected_at,
        EconomicEventType::QualityDecay,
        "Quality decay: declining rank and price pressure consistent with product fatigue".to_string(),
        Urgency::Low,
        90,
        supporting,
        contradicting,
    )
}

/// Improving BSR plus a rising price trend and a low stockout rate reads as
/// organic demand surge rather than supply pressure.
pub fn demand_surge(s: &SignalBundle) -> Option<EconomicEvent> {
    let mut supporting = Vec::new();
    let mut contradicting = Vec::new();

    if s.metrics.bsr_trend_7d <= -20.0 {
        supporting.push(format!("bsr_improvement_7d={:.1}%", s.metrics.bsr_trend_7d));
    } else {
        contradicting.push("BSR not improving sharply".to_string());
    }
    if s.metrics.price_trend_30d > 0.0 {
        supporting.push(format!("price_trend_30d={:.1}%", s.metrics.price_trend_30d));
    }
    if s.metrics.stockout_count_90d == 0 {
        supporting.push("no_recent_stockouts".to_string());
    }

    build(
        s.listing_id,
        s.detected_at,
        EconomicEventType::DemandSurge,
        "Demand surge: rank and price both improving with ample supply".to_string(),
        Urgency::High,
        21,
        supporting,
        contradicting,
    )
}

/// Price volatility with an offsetting BSR response suggests the listing is
/// meaningfully price-elastic.
pub fn price_elasticity(s: &SignalBundle) -> Option<EconomicEvent> {
    let mut supporting = Vec::new();
    let mut contradicting = Vec::new();

    if s.metrics.avg_price_volatility > 0.10 {
        supporting.push(format!("price_volatility={:.2}", s.metrics.avg_price_volatility));
    } else {
        contradicting.push("price volatility below threshold".to_string());
    }
    if s.metrics.price_trend_30d.signum() != s.metrics.bsr_trend_30d.signum() {
        supporting.push("bsr_responds_inversely_to_price".to_string());
    }
    if s.metrics.bsr_acceleration.abs() > 0.05 {
        supporting.push(format!("bsr_acceleration={:.2}", s.metrics.bsr_acceleration));
    }

    build(
        s.listing_id,
        s.detected_at,
        EconomicEventType::PriceElasticity,
        "Price elastic: demand responds measurably to recent price moves".to_string(),
        Urgency::Medium,
        30,
        supporting,
        contradicting,
    )
}

/// Runs every builder over one signal bundle, keeping at most one event per
/// type as the synthesizer contract requires (§4.5).
pub fn synthesize(s: &SignalBundle) -> Vec<EconomicEvent> {
    [supply_shock(s), competitor_collapse(s), quality_decay(s), demand_surge(s), price_elasticity(s)]
        .into_iter()
        .flatten()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartacus_domain::FulfillmentType;

    fn metrics() -> AggregatedMetrics {
        AggregatedMetrics {
            listing_id: "L1".to_string(),
            analysis_date: chrono::Utc::now().date_naive(),
            stockout_count_90d: 4,
            price_trend_30d: 10.0,
            seller_churn_90d: 2,
            bsr_acceleration: 0.12,
            bsr_trend_7d: -20.0,
            bsr_trend_30d: -15.0,
            event_counts_by_kind: serde_json::json!({}),
            last_price_drop_at: None,
            last_stockout_at: None,
            avg_price_volatility: 0.15,
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            listing_id: "L1".to_string(),
            captured_at: Utc::now(),
            current_price: "30.00".parse().unwrap(),
            list_price: None,
            lowest_new: None,
            lowest_used: None,
            currency: "USD".to_string(),
            bsr: Some(8000),
            bsr_category: None,
            stock_status: smartacus_domain::StockStatus::InStock,
            fulfillment_type: FulfillmentType::Platform,
            seller_count: 4,
            rating_average: None,
            review_count: 100,
            rating_histogram: None,
            ingestion_session_id: "s1".to_string(),
        }
    }

    #[test]
    fn test_supply_shock_fires_with_two_supporting_signals() {
        let m = metrics();
        let snap = snapshot();
        let bundle = SignalBundle {
            listing_id: "L1",
            detected_at: Utc::now(),
            metrics: &m,
            current_snapshot: &snap,
            competitor_out_of_stock: false,
        };
        let event = supply_shock(&bundle).unwrap();
        assert_eq!(event.event_type, EconomicEventType::SupplyShock);
        assert!(event.supporting_count() >= 2);
    }

    #[test]
    fn test_synthesize_keeps_one_event_per_type() {
        let m = metrics();
        let snap = snapshot();
        let bundle = SignalBundle {
            listing_id: "L1",
            detected_at: Utc::now(),
            metrics: &m,
            current_snapshot: &snap,
            competitor_out_of_stock: true,
        };
        let events = synthesize(&bundle);
        let mut seen = std::collections::HashSet::new();
        for e in &events {
            assert!(seen.insert(e.event_type));
        }
    }
}
