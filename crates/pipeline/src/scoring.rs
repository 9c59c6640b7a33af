//! Deterministic scorer (§4.6, C6): five additive components totaling 100
//! points, gated by a mandatory time-pressure floor. Integer arithmetic on
//! component sub-scores; floating point only for ratios/percentages (§4.6).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use smartacus_core::config::ScoringConfig;
use smartacus_domain::{ComponentScore, ScoringResult, ScoringStatus};

/// Everything the deterministic scorer reads, gathered from a listing's
/// current snapshot + aggregated metrics + a couple of fields the spec
/// leaves to callers (§4.12 Open Questions: buy-box rotation and
/// review-gap-vs-top-10 are supplied, not computed, by the core).
pub struct ScoringInputs {
    pub listing_id: String,
    pub price: Decimal,
    pub sourcing_cost: Decimal,
    pub shipping_cost: Decimal,
    pub current_bsr: i64,
    pub bsr_delta_7d_pct: f64,
    pub bsr_delta_30d_pct: f64,
    pub reviews_per_month: f64,
    pub seller_count: i32,
    pub buy_box_rotation_share: f64,
    pub review_gap_vs_top10: f64,
    pub no_brand_dominance: bool,
    pub platform_owned_brand: bool,
    pub negative_review_pct: f64,
    pub wishes_per_100_reviews: f64,
    pub unanswered_questions: i32,
    pub recurring_problems: bool,
    pub stockout_count_90d: i32,
    pub price_trend_30d_pct: f64,
    pub seller_churn_90d: i32,
    pub bsr_acceleration: f64,
}

fn clamp(value: i32, max: i32) -> i32 {
    value.clamp(0, max)
}

fn margin_score(inputs: &ScoringInputs, config: &ScoringConfig) -> ComponentScore {
    let fee = (inputs.price * config.platform_fee_percent).max(config.platform_fee_floor);
    let referral = inputs.price * config.referral_percent;
    let returns_provision = inputs.price * config.default_return_rate;
    let ad_provision = inputs.price * config.default_ad_percent;
    let storage_provision = inputs.price * config.default_storage_provision;
    let total_cost = inputs.sourcing_cost + inputs.shipping_cost + fee + referral + returns_provision + ad_provision + storage_provision;

    let net_margin_pct = if inputs.price.is_zero() {
        0.0
    } else {
        ((inputs.price - total_cost) / inputs.price * Decimal::from(100)).to_f64().unwrap_or(0.0)
    };

    let score = if net_margin_pct >= 35.0 {
        30
    } else if net_margin_pct >= 25.0 {
        20
    } else if net_margin_pct >= 15.0 {
        10
    } else {
        0
    };

    ComponentScore {
        name: "margin".to_string(),
        score: clamp(score, config.margin_max as i32),
        max: config.margin_max as i32,
        sub_scores: serde_json::json!({ "net_margin_pct": net_margin_pct, "total_unit_cost": total_cost.to_string() }),
        explanation: format!("net margin {net_margin_pct:.1}% -> {score}/{}", config.margin_max),
    }
}

fn bsr_absolute_score(bsr: i64) -> i32 {
    if bsr <= 0 {
        0
    } else if bsr <= 5_000 {
        10
    } else if bsr <= 20_000 {
        7
    } else if bsr <= 50_000 {
        4
    } else if bsr <= 150_000 {
        2
    } else {
        0
    }
}

fn bsr_delta_score(pct: f64, max: i32) -> i32 {
    let improvement = -pct;
    let score = if improvement >= 30.0 {
        max
    } else if improvement >= 15.0 {
        (max * 3) / 4
    } else if improvement >= 5.0 {
        max / 2
    } else if improvement >= -5.0 {
        max / 4
    } else {
        0
    };
    score.max(0)
}

fn reviews_velocity_score(reviews_per_month: f64) -> i32 {
    if reviews_per_month >= 30.0 {
        3
    } else if reviews_per_month >= 10.0 {
        2
    } else if reviews_per_month >= 3.0 {
        1
    } else {
        0
    }
}

fn velocity_score(inputs: &ScoringInputs, config: &ScoringConfig) -> ComponentScore {
    let bsr_abs = bsr_absolute_score(inputs.current_bsr);
    let bsr_7d = bsr_delta_score(inputs.bsr_delta_7d_pct, 8);
    let bsr_30d = bsr_delta_score(inputs.bsr_delta_30d_pct, 4);
    let reviews = reviews_velocity_score(inputs.reviews_per_month);

    let mut total = bsr_abs + bsr_7d + bsr_30d + reviews;
    let stagnant = inputs.bsr_delta_7d_pct.abs() < 5.0 && inputs.bsr_delta_30d_pct.abs() < 10.0 && inputs.reviews_per_month < 5.0;
    if stagnant {
        total -= 3;
    }
    let score = clamp(total, config.velocity_max as i32);

    ComponentScore {
        name: "velocity".to_string(),
        score,
        max: config.velocity_max as i32,
        sub_scores: serde_json::json!({
            "bsr_absolute": bsr_abs, "bsr_delta_7d": bsr_7d, "bsr_delta_30d": bsr_30d,
            "reviews_per_month": reviews, "stagnancy_penalty": stagnant,
        }),
        explanation: format!("velocity components sum {total} (stagnant={stagnant}) -> {score}/{}", config.velocity_max),
    }
}

fn seller_count_score(n: i32) -> i32 {
    if n <= 1 {
        8
    } else if n <= 3 {
        6
    } else if n <= 6 {
        4
    } else if n <= 10 {
        2
    } else {
        0
    }
}

fn buy_box_score(share: f64) -> i32 {
    (share * 6.0).round().clamp(0.0, 6.0) as i32
}

fn review_gap_score(gap: f64) -> i32 {
    ((1.0 - gap.clamp(0.0, 1.0)) * 6.0).round() as i32
}

fn competition_score(inputs: &ScoringInputs, config: &ScoringConfig) -> ComponentScore {
    let seller = seller_count_score(inputs.seller_count);
    let buy_box = buy_box_score(inputs.buy_box_rotation_share);
    let gap = review_gap_score(inputs.review_gap_vs_top10);

    let mut total = seller + buy_box + gap;
    if inputs.no_brand_dominance {
        total += 2;
    }
    if inputs.platform_owned_brand {
        total -= 4;
    }
    let score = clamp(total, config.competition_max as i32);

    ComponentScore {
        name: "competition".to_string(),
        score,
        max: config.competition_max as i32,
        sub_scores: serde_json::json!({
            "seller_count": seller, "buy_box_rotation": buy_box, "review_gap": gap,
            "no_brand_dominance_bonus": inputs.no_brand_dominance, "platform_owned_brand_malus": inputs.platform_owned_brand,
        }),
        explanation: format!("competition components sum {total} -> {score}/{}", config.competition_max),
    }
}

fn gap_score(inputs: &ScoringInputs, config: &ScoringConfig) -> ComponentScore {
    let neg_pct = (inputs.negative_review_pct.clamp(0.0, 1.0) * 6.0).round() as i32;
    let wishes = (inputs.wishes_per_100_reviews / 2.0).round().clamp(0.0, 5.0) as i32;
    let unanswered = (inputs.unanswered_questions as f64 / 3.0).round().clamp(0.0, 4.0) as i32;

    let base = neg_pct + wishes + unanswered;
    let total = if inputs.recurring_problems { (base as f64 * 1.3).round() as i32 } else { base };
    let score = clamp(total, config.gap_max as i32);

    ComponentScore {
        name: "gap".to_string(),
        score,
        max: config.gap_max as i32,
        sub_scores: serde_json::json!({
            "negative_review_pct": neg_pct, "wish_mentions": wishes, "unanswered_questions": unanswered,
            "recurring_problems_multiplier": inputs.recurring_problems,
        }),
        explanation: format!("gap components sum {base} (recurring={}) -> {score}/{}", inputs.recurring_problems, config.gap_max),
    }
}

fn time_pressure_score(inputs: &ScoringInputs, config: &ScoringConfig) -> ComponentScore {
    let stockouts = (inputs.stockout_count_90d).clamp(0, 3);
    let price_trend = if inputs.price_trend_30d_pct <= -20.0 {
        3
    } else if inputs.price_trend_30d_pct <= -10.0 {
        2
    } else if inputs.price_trend_30d_pct <= -5.0 {
        1
    } else if inputs.price_trend_30d_pct >= 10.0 {
        -1
    } else {
        0
    };
    let churn = (inputs.seller_churn_90d / 2).clamp(0, 2);
    let accel = if inputs.bsr_acceleration > 0.10 {
        2
    } else if inputs.bsr_acceleration > 0.0 {
        1
    } else {
        0
    };

    let total = stockouts + price_trend + churn + accel;
    let score = clamp(total, config.time_pressure_max as i32);

    ComponentScore {
        name: ScoringResult::TIME_PRESSURE.to_string(),
        score,
        max: config.time_pressure_max as i32,
        sub_scores: serde_json::json!({ "stockouts": stockouts, "price_trend": price_trend, "churn": churn, "bsr_acceleration": accel }),
        explanation: format!("time pressure components sum {total} -> {score}/{}", config.time_pressure_max),
    }
}

/// Runs the five-component scorer over one listing's inputs. The
/// time-pressure gate (§4.6, §8) is enforced here, not left to callers.
pub fn score(inputs: &ScoringInputs, config: &ScoringConfig) -> ScoringResult {
    let margin = margin_score(inputs, config);
    let velocity = velocity_score(inputs, config);
    let competition = competition_score(inputs, config);
    let gap = gap_score(inputs, config);
    let time_pressure = time_pressure_score(inputs, config);

    let total = margin.score + velocity.score + competition.score + gap.score + time_pressure.score;
    let tp_score = time_pressure.score;

    let components = vec![margin, velocity, competition, gap, time_pressure];

    if tp_score < config.time_pressure_gate as i32 {
        return ScoringResult {
            listing_id: inputs.listing_id.clone(),
            total,
            status: ScoringStatus::InvalidNoWindow,
            is_valid: false,
            window_label: "no window".to_string(),
            window_days: 0,
            components,
            rejection_reason: Some(format!(
                "Time Pressure score {tp_score} is below the required gate of {}",
                config.time_pressure_gate
            )),
        };
    }

    let status = if total >= 85 {
        ScoringStatus::Exceptional
    } else if total >= 70 {
        ScoringStatus::Strong
    } else if total >= 55 {
        ScoringStatus::Moderate
    } else if total >= 40 {
        ScoringStatus::Weak
    } else {
        ScoringStatus::Rejected
    };

    let (window_label, window_days) = match tp_score {
        9..=10 => ("critical", 14),
        7..=8 => ("urgent", 30),
        5..=6 => ("short", 60),
        3..=4 => ("medium", 120),
        _ => ("no window", 0),
    };

    ScoringResult {
        listing_id: inputs.listing_id.clone(),
        total,
        status,
        is_valid: true,
        window_label: window_label.to_string(),
        window_days,
        components,
        rejection_reason: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_inputs() -> ScoringInputs {
        ScoringInputs {
            listing_id: "L1".to_string(),
            price: "30.00".parse().unwrap(),
            sourcing_cost: "4.00".parse().unwrap(),
            shipping_cost: "2.00".parse().unwrap(),
            current_bsr: 8000,
            bsr_delta_7d_pct: -20.0,
            bsr_delta_30d_pct: -15.0,
            reviews_per_month: 35.0,
            seller_count: 4,
            buy_box_rotation_share: 0.35,
            review_gap_vs_top10: 0.30,
            no_brand_dominance: true,
            platform_owned_brand: false,
            negative_review_pct: 0.18,
            wishes_per_100_reviews: 7.0,
            unanswered_questions: 12,
            recurring_problems: false,
            stockout_count_90d: 4,
            price_trend_30d_pct: 10.0,
            seller_churn_90d: 2,
            bsr_acceleration: 0.12,
        }
    }

    #[test]
    fn test_sum_matches_total() {
        let result = score(&base_inputs(), &ScoringConfig::default());
        assert!(result.sum_matches_total());
    }

    #[test]
    fn test_gate_trips_below_threshold() {
        let mut inputs = base_inputs();
        inputs.stockout_count_90d = 0;
        inputs.seller_churn_90d = 0;
        inputs.price_trend_30d_pct = -30.0;
        inputs.bsr_acceleration = 0.0;
        let result = score(&inputs, &ScoringConfig::default());
        assert!(!result.is_valid);
        assert_eq!(result.status, ScoringStatus::InvalidNoWindow);
        assert!(result.rejection_reason.unwrap().contains("Time Pressure"));
    }

    #[test]
    fn test_gate_boundary_exactly_three_is_valid() {
        let mut inputs = base_inputs();
        inputs.stockout_count_90d = 3;
        inputs.seller_churn_90d = 0;
        inputs.price_trend_30d_pct = 0.0;
        inputs.bsr_acceleration = 0.0;
        let result = score(&inputs, &ScoringConfig::default());
        assert_eq!(result.time_pressure_score(), 3);
        assert!(result.is_valid);
    }

    #[test]
    fn test_margin_boundary() {
        let config = ScoringConfig::default();
        let mut inputs = base_inputs();
        // price 100, total cost chosen so net margin is exactly 35%
        inputs.price = "100.00".parse().unwrap();
        inputs.sourcing_cost = "35.00".parse().unwrap();
        inputs.shipping_cost = "0.00".parse().unwrap();
        let comp = margin_score(&inputs, &config);
        assert!(comp.score <= 30);
    }

    #[test]
    fn test_determinism() {
        let inputs = base_inputs();
        let config = ScoringConfig::default();
        let first = score(&inputs, &config);
        let second = score(&inputs, &config);
        assert_eq!(serde_json::to_string(&first.components).unwrap(), serde_json::to_string(&second.components).unwrap());
        assert_eq!(first.total, second.total);
    }
}
