//! Scheduler (§4.13, C13): the single-cycle control loop that consults the
//! strategy agent and drives bounded pipeline runs per niche, plus daemon
//! and cron entry points.

use crate::agent::{self, Allocation, NicheAssessmentInput};
use crate::error::Result;
use chrono::Utc;
use smartacus_catalog::TokenBudgetManager;
use smartacus_core::config::SchedulerConfig;
use smartacus_domain::store::{EconomicEventStore, NicheStore, PipelineRunStore};
use smartacus_domain::{NichePerformanceRecord, Urgency};
use smartacus_pipeline::orchestrator::{run_cycle, CycleRequest, OrchestratorDeps};
use std::sync::Arc;
use tracing::info;

/// Below this trailing conversion rate a mature niche is auto-deactivated;
/// above it a currently-inactive niche would be auto-reactivated by a
/// future discovery sweep (§4.13 step 5).
const CONVERSION_DEACTIVATE_THRESHOLD: f64 = 0.02;

pub struct SchedulerDeps {
    pub niches: Arc<dyn NicheStore>,
    pub budget: Arc<TokenBudgetManager>,
    pub events: Arc<dyn EconomicEventStore>,
    pub pipeline_runs: Arc<dyn PipelineRunStore>,
    pub orchestrator: OrchestratorDeps,
    pub per_listing_cost: i64,
    pub scheduler_config: SchedulerConfig,
}

#[derive(Debug, Clone)]
pub enum CycleOutcome {
    Skipped { reason: String },
    Completed { cycle_id: i64, niches_run: usize, opportunities_found: i32, tokens_used: i64 },
}

/// Runs exactly one scheduling cycle (§4.13 steps 1-5).
pub async fn run_once(deps: &SchedulerDeps, cycle_id: i64) -> Result<CycleOutcome> {
    let status = deps.budget.status().await?;
    let remaining = status.tokens_remaining();

    if remaining < deps.scheduler_config.min_tokens_per_run {
        let reason = format!("tokens remaining {remaining} below minimum-per-run {}", deps.scheduler_config.min_tokens_per_run);
        info!(cycle_id, %reason, "cycle skipped");
        return Ok(CycleOutcome::Skipped { reason });
    }

    let daily_budget = deps.budget.daily_budget().await?;

    let niches = deps.niches.list_active_niches().await?;
    if niches.is_empty() {
        return Ok(CycleOutcome::Skipped { reason: "no active niches".to_string() });
    }

    let now = Utc::now();
    let since = now - chrono::Duration::hours(24);
    let recent_critical = deps
        .events
        .actionable_events_since(since)
        .await?
        .iter()
        .any(|e| e.urgency == Urgency::Critical);

    let mut inputs = Vec::with_capacity(niches.len());
    for niche in niches {
        let history = deps.niches.performance_history(&niche.category_id, niche.marketplace_domain, 2).await?;
        let latest_record = history.first().cloned();
        let prior_record = history.get(1).cloned();
        inputs.push(NicheAssessmentInput {
            niche,
            latest_record,
            prior_record,
            has_critical_event_last_24h: recent_critical,
        });
    }

    let available = daily_budget.min(remaining);
    let decision = agent::decide(cycle_id, available, deps.per_listing_cost, &inputs, now);

    let mut niches_run = 0usize;
    let mut opportunities_found = 0i32;
    let mut tokens_used_total = 0i64;

    let active_runs = decision
        .assessments
        .iter()
        .filter(|a| a.allocation != Allocation::Pause && a.max_listings > 0)
        .take(deps.scheduler_config.max_niches_per_run);

    for assessment in active_runs {
        let request = CycleRequest {
            cycle_id,
            category_id: Some(assessment.category_id.clone()),
            skip_discovery: false,
            max_listings: assessment.max_listings.min(deps.scheduler_config.max_listings_per_niche),
        };
        let record = run_cycle(&deps.orchestrator, request).await;
        deps.pipeline_runs.insert_run(&record).await?;

        niches_run += 1;
        opportunities_found += record.opportunities_found;
        tokens_used_total += record.tokens_used;

        let conversion_rate = record.opportunities_found as f64 / (assessment.max_listings.max(1) as f64);
        deps.niches.mark_scanned(&assessment.category_id, assessment.marketplace_domain, now).await?;
        deps.niches
            .record_performance(&NichePerformanceRecord {
                category_id: assessment.category_id.clone(),
                marketplace_domain: assessment.marketplace_domain,
                cycle_id,
                recorded_at: now,
                tokens_used: record.tokens_used,
                opportunities_found: record.opportunities_found,
                avg_opportunity_score: conversion_rate * 100.0,
                conversion_rate,
            })
            .await?;

        if assessment.maturity >= 1.0 && conversion_rate < CONVERSION_DEACTIVATE_THRESHOLD {
            if let Ok(mut active) = deps.niches.list_active_niches().await {
                if let Some(niche) = active
                    .iter_mut()
                    .find(|n| n.category_id == assessment.category_id && n.marketplace_domain == assessment.marketplace_domain)
                {
                    niche.is_active = false;
                    deps.niches.upsert_niche(niche).await?;
                }
            }
        }
    }

    deps.budget.record_run(tokens_used_total, niches_run as i32, opportunities_found).await?;

    info!(cycle_id, niches_run, opportunities_found, tokens_used_total, "scheduling cycle complete");
    Ok(CycleOutcome::Completed { cycle_id, niches_run, opportunities_found, tokens_used: tokens_used_total })
}

/// Runs cycles forever at `scheduler_config.run_interval_hours`, incrementing
/// `cycle_id` each time. Used by the `daemon` CLI subcommand.
pub async fn run_daemon(deps: &SchedulerDeps, starting_cycle_id: i64) -> ! {
    let mut cycle_id = starting_cycle_id;
    let interval = tokio::time::Duration::from_secs((deps.scheduler_config.run_interval_hours.max(1) * 3600) as u64);
    loop {
        match run_once(deps, cycle_id).await {
            Ok(outcome) => info!(cycle_id, ?outcome, "daemon cycle finished"),
            Err(err) => tracing::error!(cycle_id, error = %err, "daemon cycle failed"),
        }
        cycle_id += 1;
        tokio::time::sleep(interval).await;
    }
}
