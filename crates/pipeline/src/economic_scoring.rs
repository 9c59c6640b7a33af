//! Economic scorer (§4.7, C7): re-scores a deterministic [`ScoringResult`]
//! with market-dynamics as a multiplier, then derives a risk-adjusted
//! monetary value and rank-score.

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use smartacus_core::config::ScoringConfig;
use smartacus_domain::{EconomicOpportunity, ScoringResult, WindowClass};

/// An active sourcing quote, when one exists (§4.7 value-estimate
/// preference order: real quote over heuristic).
pub struct SourcingQuote {
    pub unit_cost: Decimal,
    pub expires_at: chrono::DateTime<Utc>,
}

impl SourcingQuote {
    fn is_active(&self, now: chrono::DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

pub struct EconomicScoringInputs<'a> {
    pub scoring: &'a ScoringResult,
    pub retail_price: Decimal,
    pub sourcing_quote: Option<&'a SourcingQuote>,
    pub estimated_monthly_units: f64,
    pub stockout_frequency_per_month: f64,
    pub seller_churn_fraction: f64,
    pub price_volatility: f64,
    pub bsr_acceleration: f64,
}

fn stockout_factor(freq: f64) -> f64 {
    if freq >= 3.0 {
        1.5
    } else if freq >= 1.0 {
        1.2
    } else if freq >= 0.5 {
        1.0
    } else {
        0.8
    }
}

fn churn_factor(fraction: f64) -> f64 {
    if fraction > 0.30 {
        1.4
    } else if fraction > 0.20 {
        1.2
    } else if fraction > 0.10 {
        1.0
    } else {
        0.8
    }
}

fn volatility_factor(volatility: f64) -> f64 {
    if volatility > 0.20 {
        1.3
    } else if volatility > 0.10 {
        1.1
    } else {
        1.0
    }
}

fn acceleration_factor(accel: f64) -> f64 {
    if accel > 0.10 {
        1.4
    } else if accel > 0.0 {
        1.2
    } else if accel > -0.05 {
        1.0
    } else {
        0.8
    }
}

/// Composite time-multiplier: geometric mean of the four factor bands,
/// clamped to [0.5, 2.0] (§4.7).
fn time_multiplier(inputs: &EconomicScoringInputs) -> (f64, usize) {
    let factors = [
        stockout_factor(inputs.stockout_frequency_per_month),
        churn_factor(inputs.seller_churn_fraction),
        volatility_factor(inputs.price_volatility),
        acceleration_factor(inputs.bsr_acceleration),
    ];
    let geo_mean = factors.iter().product::<f64>().powf(0.25);
    let strong_factors = factors.iter().filter(|&&f| f >= 1.2).count();
    (geo_mean.clamp(0.5, 2.0), strong_factors)
}

/// Re-scores a valid [`ScoringResult`] into an [`EconomicOpportunity`].
/// Callers must check `scoring.is_valid` first — an invalid scoring result
/// has no meaningful window and should never reach this function.
pub fn economic_score(inputs: &EconomicScoringInputs, config: &ScoringConfig, now: chrono::DateTime<Utc>) -> EconomicOpportunity {
    let margin = inputs.scoring.component("margin").map(|c| c.score).unwrap_or(0);
    let velocity = inputs.scoring.component("velocity").map(|c| c.score).unwrap_or(0);
    let competition = inputs.scoring.component("competition").map(|c| c.score).unwrap_or(0);
    let gap = inputs.scoring.component("gap").map(|c| c.score).unwrap_or(0);
    let base = ((margin + velocity + competition + gap) as f64 / 90.0).clamp(0.0, 1.0);

    let (multiplier, _strong_factors) = time_multiplier(inputs);
    let window_class = WindowClass::from_multiplier(multiplier);

    let sourcing_cost = match inputs.sourcing_quote.filter(|q| q.is_active(now)) {
        Some(quote) => quote.unit_cost,
        None => inputs.retail_price / Decimal::from(5) + Decimal::new(300, 2),
    };

    let fee = (inputs.retail_price * config.platform_fee_percent).max(config.platform_fee_floor);
    let referral = inputs.retail_price * config.referral_percent;
    let ad_provision = inputs.retail_price * config.default_ad_percent;
    let returns_provision = inputs.retail_price * config.default_return_rate;
    let total_unit_cost = sourcing_cost + fee + referral + ad_provision + returns_provision;

    let profit_per_unit = (inputs.retail_price - total_unit_cost).max(Decimal::ZERO);
    let monthly_units = Decimal::from_f64_retain(inputs.estimated_monthly_units).unwrap_or(Decimal::ZERO);
    let monthly_profit = profit_per_unit * monthly_units;
    let annual_value = monthly_profit * Decimal::from(12);
    let risk_adjusted_value = annual_value * (Decimal::ONE - config.default_risk_factor);

    let final_score = (base * multiplier * 100.0).round().min(100.0).max(0.0);

    let window_days = match window_class {
        WindowClass::Critical => 14,
        WindowClass::Urgent => 30,
        WindowClass::Active => 60,
        WindowClass::Standard => 90,
        WindowClass::Extended => 180,
    };

    let rank_score = risk_adjusted_value.to_f64().unwrap_or(0.0) * window_class.urgency().rank_weight();

    EconomicOpportunity {
        listing_id: inputs.scoring.listing_id.clone(),
        detected_at: now,
        base_score: base,
        time_multiplier: multiplier,
        final_score,
        estimated_monthly_profit: monthly_profit,
        estimated_annual_value: annual_value,
        risk_adjusted_value,
        window_class,
        window_days,
        thesis: format!(
            "base {base:.2} x time-multiplier {multiplier:.2} ({window_class:?} window); annual value ${annual_value:.2}"
        ),
        rank_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartacus_domain::{ComponentScore, ScoringStatus};

    fn scoring_result() -> ScoringResult {
        ScoringResult {
            listing_id: "L1".to_string(),
            total: 75,
            status: ScoringStatus::Strong,
            is_valid: true,
            window_label: "urgent".to_string(),
            window_days: 30,
            components: vec![
                ComponentScore { name: "margin".to_string(), score: 20, max: 30, sub_scores: serde_json::json!({}), explanation: String::new() },
                ComponentScore { name: "velocity".to_string(), score: 20, max: 25, sub_scores: serde_json::json!({}), explanation: String::new() },
                ComponentScore { name: "competition".to_string(), score: 15, max: 20, sub_scores: serde_json::json!({}), explanation: String::new() },
                ComponentScore { name: "gap".to_string(), score: 12, max: 15, sub_scores: serde_json::json!({}), explanation: String::new() },
                ComponentScore { name: "time_pressure".to_string(), score: 8, max: 10, sub_scores: serde_json::json!({}), explanation: String::new() },
            ],
            rejection_reason: None,
        }
    }

    #[test]
    fn test_time_multiplier_within_bounds() {
        let scoring = scoring_result();
        let inputs = EconomicScoringInputs {
            scoring: &scoring,
            retail_price: "30.00".parse().unwrap(),
            sourcing_quote: None,
            estimated_monthly_units: 200.0,
            stockout_frequency_per_month: 1.5,
            seller_churn_fraction: 0.25,
            price_volatility: 0.15,
            bsr_acceleration: 0.10,
        };
        let opp = economic_score(&inputs, &ScoringConfig::default(), Utc::now());
        assert!(opp.time_multiplier >= 0.5 && opp.time_multiplier <= 2.0);
        assert!(opp.final_score >= 0.0 && opp.final_score <= 100.0);
        assert!(opp.time_multiplier > 1.0);
    }

    #[test]
    fn test_sourcing_quote_overrides_heuristic() {
        let scoring = scoring_result();
        let quote = SourcingQuote { unit_cost: "1.00".parse().unwrap(), expires_at: Utc::now() + chrono::Duration::days(30) };
        let inputs = EconomicScoringInputs {
            scoring: &scoring,
            retail_price: "30.00".parse().unwrap(),
            sourcing_quote: Some(&quote),
            estimated_monthly_units: 100.0,
            stockout_frequency_per_month: 0.0,
            seller_churn_fraction: 0.0,
            price_volatility: 0.0,
            bsr_acceleration: -0.10,
        };
        let opp = economic_score(&inputs, &ScoringConfig::default(), Utc::now());
        assert!(opp.estimated_monthly_profit > Decimal::ZERO);
    }
}
