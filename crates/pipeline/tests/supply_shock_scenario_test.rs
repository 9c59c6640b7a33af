//! End-to-end scan of one listing through the deterministic scorer and the
//! economic scorer together, using a supply-shock-shaped input set: falling
//! BSR, repeated stockouts, a thin competitive field and a rising price.

use rust_decimal::Decimal;
use smartacus_core::config::ScoringConfig;
use smartacus_pipeline::{economic_score, score, EconomicScoringInputs, ScoringInputs};

fn supply_shock_inputs() -> ScoringInputs {
    ScoringInputs {
        listing_id: "B0SUPPLYSHOCK".to_string(),
        price: Decimal::new(3000, 2),
        sourcing_cost: Decimal::new(400, 2),
        shipping_cost: Decimal::new(200, 2),
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
fn supply_shock_listing_clears_the_shortlist_bar() {
    let config = ScoringConfig::default();
    let inputs = supply_shock_inputs();
    let result = score(&inputs, &config);

    assert!(result.is_valid);
    let component_sum: i32 = result.components.iter().map(|c| c.score).sum();
    assert_eq!(component_sum, result.total);
    assert!(result.total >= 60, "expected a strong total, got {}", result.total);

    let econ_inputs = EconomicScoringInputs {
        scoring: &result,
        retail_price: inputs.price,
        sourcing_quote: None,
        estimated_monthly_units: 200.0,
        stockout_frequency_per_month: 1.5,
        seller_churn_fraction: 0.25,
        price_volatility: 0.15,
        bsr_acceleration: 0.10,
    };
    let opportunity = economic_score(&econ_inputs, &config, chrono::Utc::now());

    assert!(opportunity.time_multiplier > 1.0);
    assert!(matches!(
        opportunity.window_class,
        smartacus_domain::WindowClass::Critical | smartacus_domain::WindowClass::Urgent | smartacus_domain::WindowClass::Active
    ));
    assert!(opportunity.estimated_annual_value > Decimal::ZERO);
    assert!(opportunity.rank_score > 0.0);
    assert!(opportunity.passes_shortlist_filters(50.0, Decimal::new(500000, 2)));
}
