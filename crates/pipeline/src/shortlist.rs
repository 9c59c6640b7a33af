//! Shortlist generator (§4.8, C8): filters and ranks [`EconomicOpportunity`]
//! rows into the handful a human actually reviews.

use rust_decimal::Decimal;
use smartacus_domain::{EconomicOpportunity, WindowClass};

pub struct ShortlistFilters {
    pub min_final_score: f64,
    pub min_risk_adjusted_value: Decimal,
    pub max_entries: usize,
}

impl Default for ShortlistFilters {
    fn default() -> Self {
        Self { min_final_score: 50.0, min_risk_adjusted_value: Decimal::new(500_000, 2), max_entries: 5 }
    }
}

#[derive(Debug, Clone)]
pub struct ShortlistEntry {
    pub rank: usize,
    pub listing_id: String,
    pub final_score: f64,
    pub window_days: i32,
    pub urgency_label: String,
    pub estimated_annual_value: Decimal,
    pub risk_adjusted_value: Decimal,
    pub thesis: String,
    pub recommendation: String,
}

/// Filters by the dual gate (score and value), sorts by rank-score
/// descending, and truncates to `max_entries` (§4.8).
pub fn build_shortlist(opportunities: &[EconomicOpportunity], filters: &ShortlistFilters) -> Vec<ShortlistEntry> {
    let mut passing: Vec<&EconomicOpportunity> = opportunities
        .iter()
        .filter(|o| o.passes_shortlist_filters(filters.min_final_score, filters.min_risk_adjusted_value))
        .collect();

    passing.sort_by(|a, b| b.rank_score.partial_cmp(&a.rank_score).unwrap_or(std::cmp::Ordering::Equal));

    passing
        .into_iter()
        .take(filters.max_entries)
        .enumerate()
        .map(|(i, o)| ShortlistEntry {
            rank: i + 1,
            listing_id: o.listing_id.clone(),
            final_score: o.final_score,
            window_days: o.window_days,
            urgency_label: format!("{:?}", window_class_urgency(o.window_class)),
            estimated_annual_value: o.estimated_annual_value,
            risk_adjusted_value: o.risk_adjusted_value,
            thesis: o.thesis.clone(),
            recommendation: WindowClass::recommendation_for_days(o.window_days).to_string(),
        })
        .collect()
}

fn window_class_urgency(window_class: WindowClass) -> smartacus_domain::Urgency {
    window_class.urgency()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn opp(listing_id: &str, final_score: f64, risk_adjusted_value: &str, rank_score: f64) -> EconomicOpportunity {
        EconomicOpportunity {
            listing_id: listing_id.to_string(),
            detected_at: Utc::now(),
            base_score: 0.5,
            time_multiplier: 1.2,
            final_score,
            estimated_monthly_profit: "500.00".parse().unwrap(),
            estimated_annual_value: "6000.00".parse().unwrap(),
            risk_adjusted_value: risk_adjusted_value.parse().unwrap(),
            window_class: WindowClass::Active,
            window_days: 45,
            thesis: "test thesis".to_string(),
            rank_score,
        }
    }

    #[test]
    fn test_filters_below_threshold() {
        let opps = vec![opp("A", 40.0, "10000.00", 10.0), opp("B", 70.0, "1000.00", 5.0)];
        let shortlist = build_shortlist(&opps, &ShortlistFilters::default());
        assert!(shortlist.is_empty());
    }

    #[test]
    fn test_sorts_by_rank_score_desc_and_truncates() {
        let opps = vec![
            opp("A", 60.0, "10000.00", 5.0),
            opp("B", 70.0, "20000.00", 50.0),
            opp("C", 80.0, "30000.00", 20.0),
        ];
        let filters = ShortlistFilters { max_entries: 2, ..Default::default() };
        let shortlist = build_shortlist(&opps, &filters);
        assert_eq!(shortlist.len(), 2);
        assert_eq!(shortlist[0].listing_id, "B");
        assert_eq!(shortlist[0].rank, 1);
        assert_eq!(shortlist[1].listing_id, "C");
    }
}
