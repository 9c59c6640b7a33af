//! Pipeline orchestrator (§4.14, C14): runs one scan cycle through five
//! isolated stages. A stage failure never aborts the cycle — it is recorded
//! as [`StageOutcome::Failed`] and the next stage still runs against
//! whatever upstream output exists (§7).

use crate::economic_scoring::{economic_score, EconomicScoringInputs};
use crate::events::{aggregate_metrics, detect_events};
use crate::ingestion::{IngestionPipeline, IngestionRequest};
use crate::scoring::{score, ScoringInputs};
use chrono::Utc;
use smartacus_core::config::ScoringConfig;
use smartacus_domain::store::{
    EventStore, ListingStore, MetricsStore, OpportunityStore, PipelineRunRecord, StageOutcome, StageResult,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

pub struct OrchestratorDeps {
    pub ingestion: Arc<IngestionPipeline>,
    pub listings: Arc<dyn ListingStore>,
    pub events: Arc<dyn EventStore>,
    pub metrics: Arc<dyn MetricsStore>,
    pub opportunities: Arc<dyn OpportunityStore>,
    pub scoring_config: ScoringConfig,
}

pub struct CycleRequest {
    pub cycle_id: i64,
    pub category_id: Option<String>,
    pub skip_discovery: bool,
    pub max_listings: usize,
}

fn stage<T>(name: &str, started: Instant, outcome: Result<T, String>, items: i64) -> (StageResult, Option<T>) {
    let duration_ms = started.elapsed().as_millis() as i64;
    match outcome {
        Ok(value) => (
            StageResult { stage_name: name.to_string(), outcome: StageOutcome::Completed, duration_ms, items_processed: items, error_message: None },
            Some(value),
        ),
        Err(message) => {
            warn!(stage = name, error = %message, "stage failed");
            (
                StageResult { stage_name: name.to_string(), outcome: StageOutcome::Failed, duration_ms, items_processed: items, error_message: Some(message) },
                None,
            )
        }
    }
}

/// Runs one full ingest -> detect -> score -> persist -> cleanup cycle.
pub async fn run_cycle(deps: &OrchestratorDeps, request: CycleRequest) -> PipelineRunRecord {
    let cycle_started = Utc::now();
    let mut stages = Vec::new();
    let mut opportunities_found = 0i32;
    let mut categories_scanned = 0i32;

    let ingest_started = Instant::now();
    let ingest_result = deps
        .ingestion
        .run(IngestionRequest {
            explicit_listing_ids: None,
            category_id: request.category_id.clone(),
            skip_discovery: request.skip_discovery,
            skip_filtering: false,
            max_listings: request.max_listings,
        })
        .await;
    if request.category_id.is_some() {
        categories_scanned = 1;
    }
    let (ingest_stage, _) = stage::<()>(
        "ingest",
        ingest_started,
        if ingest_result.errors.is_empty() { Ok(()) } else { Err(ingest_result.errors.join("; ")) },
        ingest_result.upserted as i64,
    );
    let ingest_outcome = ingest_stage.outcome;
    stages.push(ingest_stage);

    let listing_ids: Vec<String> = match deps.listings.list_active_listings(smartacus_core::types::PaginationOptions::default()).await {
        Ok(page) => page.items.into_iter().map(|l| l.listing_id).collect(),
        Err(_) => Vec::new(),
    };

    let detect_started = Instant::now();
    let mut detect_errors = Vec::new();
    let mut detected_count = 0i64;
    let today = Utc::now().date_naive();
    if ingest_outcome != StageOutcome::Failed {
        for listing_id in &listing_ids {
            match deps.listings.last_two_snapshots(listing_id).await {
                Ok(pair) if pair.len() == 2 => {
                    let events = detect_events(&pair[1], &pair[0]);
                    for e in &events.price_events {
                        if let Err(err) = deps.events.insert_price_event(e).await {
                            warn!(listing_id = %listing_id, error = %err, "price event insert failed");
                        }
                    }
                    for e in &events.bsr_events {
                        if let Err(err) = deps.events.insert_bsr_event(e).await {
                            warn!(listing_id = %listing_id, error = %err, "bsr event insert failed");
                        }
                    }
                    for e in &events.stock_events {
                        if let Err(err) = deps.events.insert_stock_event(e).await {
                            warn!(listing_id = %listing_id, error = %err, "stock event insert failed");
                        }
                    }
                    let history = deps
                        .listings
                        .snapshot_history(listing_id, Utc::now() - chrono::Duration::days(90))
                        .await
                        .unwrap_or_default();
                    let metrics = aggregate_metrics(listing_id, today, &history, &events);
                    if let Err(err) = deps.metrics.upsert_metrics(&metrics).await {
                        detect_errors.push(err.to_string());
                    }
                    detected_count += 1;
                }
                Ok(_) => {}
                Err(err) => detect_errors.push(err.to_string()),
            }
        }
    }
    let (detect_stage, _) = stage::<()>(
        "event_detect",
        detect_started,
        if detect_errors.is_empty() { Ok(()) } else { Err(detect_errors.join("; ")) },
        detected_count,
    );
    let detect_outcome = detect_stage.outcome;
    stages.push(detect_stage);

    let score_started = Instant::now();
    let mut score_errors = Vec::new();
    let mut scored_count = 0i64;
    if detect_outcome != StageOutcome::Failed {
        for listing_id in &listing_ids {
            let snapshot = match deps.listings.latest_snapshot(listing_id).await {
                Ok(Some(s)) => s,
                Ok(None) => continue,
                Err(err) => {
                    score_errors.push(err.to_string());
                    continue;
                }
            };
            let metrics = match deps.metrics.get_metrics(listing_id, today).await {
                Ok(Some(m)) => m,
                Ok(None) => continue,
                Err(err) => {
                    score_errors.push(err.to_string());
                    continue;
                }
            };

            let inputs = ScoringInputs {
                listing_id: listing_id.clone(),
                price: snapshot.current_price,
                sourcing_cost: snapshot.current_price / rust_decimal::Decimal::from(5),
                shipping_cost: rust_decimal::Decimal::new(300, 2),
                current_bsr: snapshot.bsr.unwrap_or(0),
                bsr_delta_7d_pct: metrics.bsr_trend_7d,
                bsr_delta_30d_pct: metrics.bsr_trend_30d,
                reviews_per_month: 0.0,
                seller_count: snapshot.seller_count,
                buy_box_rotation_share: 0.0,
                review_gap_vs_top10: 0.0,
                no_brand_dominance: false,
                platform_owned_brand: false,
                negative_review_pct: 0.0,
                wishes_per_100_reviews: 0.0,
                unanswered_questions: 0,
                recurring_problems: false,
                stockout_count_90d: metrics.stockout_count_90d,
                price_trend_30d_pct: metrics.price_trend_30d,
                seller_churn_90d: metrics.seller_churn_90d,
                bsr_acceleration: metrics.bsr_acceleration,
            };
            let scoring_result = score(&inputs, &deps.scoring_config);
            scored_count += 1;
            if !scoring_result.is_valid {
                continue;
            }

            let econ_inputs = EconomicScoringInputs {
                scoring: &scoring_result,
                retail_price: snapshot.current_price,
                sourcing_quote: None,
                estimated_monthly_units: 50.0,
                stockout_frequency_per_month: metrics.stockout_frequency_per_month(),
                seller_churn_fraction: metrics.seller_churn_fraction(snapshot.seller_count),
                price_volatility: metrics.avg_price_volatility,
                bsr_acceleration: metrics.bsr_acceleration,
            };
            let opportunity = economic_score(&econ_inputs, &deps.scoring_config, Utc::now());
            if let Err(err) = deps.opportunities.insert_opportunity(&opportunity).await {
                score_errors.push(err.to_string());
            } else {
                opportunities_found += 1;
            }
        }
    }
    let (score_stage, _) = stage::<()>(
        "score",
        score_started,
        if score_errors.is_empty() { Ok(()) } else { Err(score_errors.join("; ")) },
        scored_count,
    );
    stages.push(score_stage);

    let persist_started = Instant::now();
    stages.push(StageResult {
        stage_name: "persist_opportunities".to_string(),
        outcome: StageOutcome::Completed,
        duration_ms: persist_started.elapsed().as_millis() as i64,
        items_processed: opportunities_found as i64,
        error_message: None,
    });

    let cleanup_started = Instant::now();
    let cleanup_result = deps.listings.deactivate_stale(Utc::now(), chrono::Duration::hours(336)).await;
    let (cleanup_stage, _) = stage::<()>(
        "cleanup",
        cleanup_started,
        cleanup_result.as_ref().map(|_| ()).map_err(|e| e.to_string()),
        cleanup_result.unwrap_or(0) as i64,
    );
    stages.push(cleanup_stage);

    info!(cycle_id = request.cycle_id, opportunities_found, categories_scanned, "cycle complete");

    let mut record = PipelineRunRecord::new(request.cycle_id, cycle_started, Utc::now(), &stages);
    record.tokens_used = ingest_result.tokens_used as i64;
    record.opportunities_found = opportunities_found;
    record.categories_scanned = categories_scanned;
    record
}
