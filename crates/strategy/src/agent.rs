//! Strategy agent (§4.12, C12): tri-partitions active niches into
//! EXPLOIT/EXPLORE/PAUSE and allocates the monthly token budget across them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use smartacus_domain::{Niche, NichePerformanceRecord};

const EXPLOIT_POOL_FRACTION: f64 = 0.70;
const EXPLORE_POOL_FRACTION: f64 = 0.20;
const RECENCY_WINDOW_DAYS: f64 = 14.0;
const TIE_THRESHOLD: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allocation {
    Exploit,
    Explore,
    Pause,
}

/// Per-niche observations the scheduler gathers before calling the agent.
pub struct NicheAssessmentInput {
    pub niche: Niche,
    pub latest_record: Option<NichePerformanceRecord>,
    pub prior_record: Option<NichePerformanceRecord>,
    pub has_critical_event_last_24h: bool,
}

#[derive(Debug, Clone)]
pub struct NicheAssessment {
    pub category_id: String,
    pub marketplace_domain: i32,
    pub value_per_token: f64,
    pub recency_score: f64,
    pub momentum: f64,
    pub maturity: f64,
    pub event_boost: bool,
    pub allocation: Allocation,
    pub allocated_tokens: i64,
    pub max_listings: usize,
}

#[derive(Debug, Clone)]
pub struct Decision {
    pub cycle_id: i64,
    pub assessments: Vec<NicheAssessment>,
    pub risk_notes: Vec<String>,
}

/// Queried only when two or more niches tie within [`TIE_THRESHOLD`] of a
/// pool boundary (§4.12). The decision is fully deterministic without it.
#[async_trait]
pub trait DecisionOracle: Send + Sync {
    async fn favor_upper_tier(&self, category_id: &str, value_per_token: f64, boundary: f64) -> bool;
}

struct RawSignal {
    niche: Niche,
    value_per_token: f64,
    recency_score: f64,
    momentum: f64,
    maturity: f64,
    event_boost: bool,
}

fn step_up(allocation: Allocation) -> Allocation {
    match allocation {
        Allocation::Pause => Allocation::Explore,
        Allocation::Explore => Allocation::Exploit,
        Allocation::Exploit => Allocation::Exploit,
    }
}

fn compute_signal(input: &NicheAssessmentInput, now: DateTime<Utc>) -> RawSignal {
    let total_opportunities = input.niche.total_opportunities_found as f64;
    let avg_opportunity_score = input.latest_record.as_ref().map(|r| r.avg_opportunity_score).unwrap_or(0.0);
    let tokens_used = input.latest_record.as_ref().map(|r| r.tokens_used).unwrap_or(0).max(1) as f64;
    let value_per_token = total_opportunities * avg_opportunity_score / tokens_used;

    let days_since_scan = input.niche.days_since_last_scan(now);
    let recency_score = if days_since_scan.is_infinite() { 1.0 } else { (days_since_scan / RECENCY_WINDOW_DAYS).min(1.0) };

    let momentum = match (&input.latest_record, &input.prior_record) {
        (Some(latest), Some(prior)) => latest.conversion_rate - prior.conversion_rate,
        _ => 0.0,
    };

    let maturity = (input.niche.total_runs as f64 / 5.0).min(1.0);

    RawSignal {
        niche: input.niche.clone(),
        value_per_token,
        recency_score,
        momentum,
        maturity,
        event_boost: input.has_critical_event_last_24h,
    }
}

fn tercile_boundaries(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let low_idx = sorted.len() / 3;
    let high_idx = (2 * sorted.len() / 3).min(sorted.len() - 1);
    (sorted[low_idx], sorted[high_idx])
}

fn classify(signal: &RawSignal, low: f64, high: f64) -> Allocation {
    let base = if signal.maturity < 1.0 || signal.recency_score >= 0.8 {
        Allocation::Explore
    } else if signal.value_per_token >= high && signal.maturity >= 1.0 {
        Allocation::Exploit
    } else if signal.value_per_token <= low && signal.maturity >= 1.0 && !signal.event_boost {
        Allocation::Pause
    } else {
        Allocation::Explore
    };

    if signal.event_boost {
        step_up(base)
    } else {
        base
    }
}

fn allocate_pool(signals: &[(&RawSignal, Allocation)], allocation: Allocation, pool_tokens: i64, proportional: bool) -> std::collections::HashMap<String, i64> {
    let members: Vec<&RawSignal> = signals.iter().filter(|(_, a)| *a == allocation).map(|(s, _)| *s).collect();
    let mut out = std::collections::HashMap::new();
    if members.is_empty() || pool_tokens <= 0 {
        return out;
    }

    if proportional {
        let total_value: f64 = members.iter().map(|s| s.value_per_token.max(0.0)).sum();
        if total_value <= 0.0 {
            let share = pool_tokens / members.len() as i64;
            for s in &members {
                out.insert(niche_key(&s.niche), share);
            }
        } else {
            for s in &members {
                let share = (s.value_per_token.max(0.0) / total_value) * pool_tokens as f64;
                out.insert(niche_key(&s.niche), share.round() as i64);
            }
        }
    } else {
        let share = pool_tokens / members.len() as i64;
        for s in &members {
            out.insert(niche_key(&s.niche), share);
        }
    }
    out
}

fn niche_key(niche: &Niche) -> String {
    format!("{}:{}", niche.category_id, niche.marketplace_domain)
}

/// Deterministic decision: terciles, base classification, event-boost
/// step-up, pool allocation. No external I/O.
pub fn decide(cycle_id: i64, available_tokens: i64, per_listing_cost: i64, inputs: &[NicheAssessmentInput], now: DateTime<Utc>) -> Decision {
    let signals: Vec<RawSignal> = inputs.iter().map(|i| compute_signal(i, now)).collect();
    let values: Vec<f64> = signals.iter().map(|s| s.value_per_token).collect();
    let (low, high) = tercile_boundaries(&values);

    let classified: Vec<(&RawSignal, Allocation)> = signals.iter().map(|s| (s, classify(s, low, high))).collect();

    let exploit_pool = (available_tokens as f64 * EXPLOIT_POOL_FRACTION).floor() as i64;
    let explore_pool = (available_tokens as f64 * EXPLORE_POOL_FRACTION).floor() as i64;
    let reserve = available_tokens - exploit_pool - explore_pool;

    let exploit_alloc = allocate_pool(&classified, Allocation::Exploit, exploit_pool, true);
    let explore_alloc = allocate_pool(&classified, Allocation::Explore, explore_pool, false);

    let mut risk_notes = vec![format!("reserve held: {reserve} tokens")];
    for (signal, allocation) in &classified {
        if signal.maturity < 1.0 && *allocation == Allocation::Pause {
            risk_notes.push(format!("{} protected from pause: maturity < 1 run threshold", niche_key(&signal.niche)));
        }
        if (signal.value_per_token - low).abs() / low.abs().max(1e-9) <= TIE_THRESHOLD
            || (signal.value_per_token - high).abs() / high.abs().max(1e-9) <= TIE_THRESHOLD
        {
            risk_notes.push(format!("{} within tie threshold of a tercile boundary", niche_key(&signal.niche)));
        }
    }

    let assessments = classified
        .into_iter()
        .map(|(signal, allocation)| {
            let key = niche_key(&signal.niche);
            let allocated_tokens = match allocation {
                Allocation::Exploit => *exploit_alloc.get(&key).unwrap_or(&0),
                Allocation::Explore => *explore_alloc.get(&key).unwrap_or(&0),
                Allocation::Pause => 0,
            };
            let max_listings = if per_listing_cost > 0 { (allocated_tokens / per_listing_cost).max(0) as usize } else { 0 };
            NicheAssessment {
                category_id: signal.niche.category_id.clone(),
                marketplace_domain: signal.niche.marketplace_domain,
                value_per_token: signal.value_per_token,
                recency_score: signal.recency_score,
                momentum: signal.momentum,
                maturity: signal.maturity,
                event_boost: signal.event_boost,
                allocation,
                allocated_tokens,
                max_listings,
            }
        })
        .collect();

    Decision { cycle_id, assessments, risk_notes }
}

/// Runs [`decide`], then for any assessment within [`TIE_THRESHOLD`] of a
/// pool boundary, consults `oracle` and may bump it up one tier. Falls back
/// to the deterministic decision when no tie exists.
pub async fn decide_with_oracle(
    cycle_id: i64,
    available_tokens: i64,
    per_listing_cost: i64,
    inputs: &[NicheAssessmentInput],
    now: DateTime<Utc>,
    oracle: &dyn DecisionOracle,
) -> Decision {
    let mut decision = decide(cycle_id, available_tokens, per_listing_cost, inputs, now);
    let values: Vec<f64> = decision.assessments.iter().map(|a| a.value_per_token).collect();
    let (low, high) = tercile_boundaries(&values);

    for assessment in decision.assessments.iter_mut() {
        let near_low = low.abs() > 1e-9 && (assessment.value_per_token - low).abs() / low.abs() <= TIE_THRESHOLD;
        let near_high = high.abs() > 1e-9 && (assessment.value_per_token - high).abs() / high.abs() <= TIE_THRESHOLD;
        if near_low || near_high {
            let boundary = if near_high { high } else { low };
            if oracle.favor_upper_tier(&assessment.category_id, assessment.value_per_token, boundary).await {
                assessment.allocation = step_up(assessment.allocation);
            }
        }
    }
    decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn niche(category_id: &str, total_runs: i32, total_opportunities: i32, last_scanned_days_ago: Option<i64>) -> Niche {
        Niche {
            category_id: category_id.to_string(),
            marketplace_domain: 1,
            name: category_id.to_string(),
            path: serde_json::json!([]),
            priority: 1,
            is_active: true,
            total_runs,
            total_opportunities_found: total_opportunities,
            conversion_rate: 0.1,
            last_scanned_at: last_scanned_days_ago.map(|d| Utc::now() - Duration::days(d)),
        }
    }

    fn record(tokens_used: i64, avg_score: f64, conversion_rate: f64) -> NichePerformanceRecord {
        NichePerformanceRecord {
            category_id: "x".to_string(),
            marketplace_domain: 1,
            cycle_id: 1,
            recorded_at: Utc::now(),
            tokens_used,
            opportunities_found: 5,
            avg_opportunity_score: avg_score,
            conversion_rate,
        }
    }

    #[test]
    fn test_reserve_is_ten_percent() {
        let inputs = vec![NicheAssessmentInput {
            niche: niche("a", 6, 10, Some(1)),
            latest_record: Some(record(1000, 60.0, 0.1)),
            prior_record: None,
            has_critical_event_last_24h: false,
        }];
        let decision = decide(1, 10_000, 2, &inputs, Utc::now());
        assert!(decision.risk_notes.iter().any(|n| n.contains("reserve held: 1000")));
    }

    #[test]
    fn test_immature_niche_goes_to_explore() {
        let inputs = vec![NicheAssessmentInput {
            niche: niche("new", 1, 0, None),
            latest_record: None,
            prior_record: None,
            has_critical_event_last_24h: false,
        }];
        let decision = decide(1, 10_000, 2, &inputs, Utc::now());
        assert_eq!(decision.assessments[0].allocation, Allocation::Explore);
    }

    #[test]
    fn test_event_boost_steps_pause_to_explore() {
        let inputs = vec![
            NicheAssessmentInput {
                niche: niche("weak", 6, 1, Some(1)),
                latest_record: Some(record(5000, 1.0, 0.05)),
                prior_record: None,
                has_critical_event_last_24h: true,
            },
            NicheAssessmentInput {
                niche: niche("strong", 6, 50, Some(1)),
                latest_record: Some(record(500, 90.0, 0.3)),
                prior_record: None,
                has_critical_event_last_24h: false,
            },
        ];
        let decision = decide(1, 10_000, 2, &inputs, Utc::now());
        let weak = decision.assessments.iter().find(|a| a.category_id == "weak").unwrap();
        assert_ne!(weak.allocation, Allocation::Pause);
    }

    #[test]
    fn test_exploit_allocation_proportional_to_value_per_token() {
        let inputs = vec![
            NicheAssessmentInput {
                niche: niche("big", 10, 100, Some(1)),
                latest_record: Some(record(100, 90.0, 0.3)),
                prior_record: None,
                has_critical_event_last_24h: false,
            },
            NicheAssessmentInput {
                niche: niche("small", 10, 20, Some(1)),
                latest_record: Some(record(100, 90.0, 0.3)),
                prior_record: None,
                has_critical_event_last_24h: false,
            },
        ];
        let decision = decide(1, 10_000, 2, &inputs, Utc::now());
        let big = decision.assessments.iter().find(|a| a.category_id == "big").unwrap();
        let small = decision.assessments.iter().find(|a| a.category_id == "small").unwrap();
        if big.allocation == Allocation::Exploit && small.allocation == Allocation::Exploit {
            assert!(big.allocated_tokens >= small.allocated_tokens);
        }
    }
}
