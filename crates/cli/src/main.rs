//! Command-line entry point: `smartacus cron` runs exactly one scheduling
//! cycle and exits; `smartacus daemon` wraps the same cycle in a sleep-loop
//! (§4.13, §6). Process exit codes and `std::process::exit` are confined to
//! this binary — library crates never call `exit`.

use clap::{Parser, Subcommand};
use smartacus_catalog::{ReqwestCatalogClient, TokenBudgetManager};
use smartacus_core::{Config, DatabasePool};
use smartacus_domain::store::{
    PostgresBudgetStore, PostgresEconomicEventStore, PostgresEventStore, PostgresListingStore, PostgresMetricsStore,
    PostgresNicheStore, PostgresOpportunityStore, PostgresPipelineRunStore,
};
use smartacus_pipeline::orchestrator::OrchestratorDeps;
use smartacus_pipeline::IngestionPipeline;
use smartacus_strategy::{run_daemon, run_once, CycleOutcome, SchedulerDeps};
use std::process;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "smartacus")]
#[command(about = "Market-intelligence scan-to-shortlist pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run exactly one scheduling cycle and exit (§6: either mode satisfies
    /// the scheduler contract).
    Cron,
    /// Run scheduling cycles forever at the configured interval.
    Daemon,
}

#[tokio::main]
async fn main() {
    smartacus_core::logging::init();

    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            process::exit(1);
        }
    };

    let db = match DatabasePool::connect(&config.database).await {
        Ok(db) => db,
        Err(err) => {
            error!(error = %err, "failed to connect to database");
            process::exit(1);
        }
    };

    let deps = match build_scheduler_deps(&config, db) {
        Ok(deps) => deps,
        Err(err) => {
            error!(error = %err, "failed to build scheduler dependencies");
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Cron => {
            let outcome = run_once(&deps, 1).await;
            match outcome {
                Ok(CycleOutcome::Completed { niches_run, opportunities_found, .. }) => {
                    info!(niches_run, opportunities_found, "cron cycle completed");
                    process::exit(0);
                }
                Ok(CycleOutcome::Skipped { reason }) => {
                    info!(%reason, "cron cycle skipped");
                    process::exit(0);
                }
                Err(err) => {
                    error!(error = %err, "cron cycle failed");
                    process::exit(1);
                }
            }
        }
        Commands::Daemon => {
            run_daemon(&deps, 1).await;
        }
    }
}

fn build_scheduler_deps(config: &Config, db: DatabasePool) -> anyhow::Result<SchedulerDeps> {
    let catalog = Arc::new(ReqwestCatalogClient::new(
        &config.catalog.api_key,
        &config.catalog.base_url,
        config.catalog.tokens_per_minute,
        config.catalog.max_retries,
        config.catalog.request_timeout_s,
        config.catalog.max_retry_delay_s,
    )?);

    let listings = Arc::new(PostgresListingStore::new(db.clone()));
    let events = Arc::new(PostgresEventStore::new(db.clone()));
    let economic_events = Arc::new(PostgresEconomicEventStore::new(db.clone()));
    let metrics = Arc::new(PostgresMetricsStore::new(db.clone()));
    let opportunities = Arc::new(PostgresOpportunityStore::new(db.clone()));
    let niches = Arc::new(PostgresNicheStore::new(db.clone()));
    let budget_store = Arc::new(PostgresBudgetStore::new(db.clone()));
    let pipeline_runs = Arc::new(PostgresPipelineRunStore::new(db.clone()));

    let ingestion = Arc::new(IngestionPipeline::new(catalog, listings.clone(), config.ingestion.clone()));

    let budget = Arc::new(TokenBudgetManager::new(
        budget_store,
        config.budget.monthly_limit,
        config.budget.discovery_allocation_percent,
        config.budget.scanning_allocation_percent,
    ));

    Ok(SchedulerDeps {
        niches,
        budget,
        events: economic_events,
        pipeline_runs,
        orchestrator: OrchestratorDeps {
            ingestion,
            listings,
            events,
            metrics,
            opportunities,
            scoring_config: config.scoring.clone(),
        },
        per_listing_cost: config.budget.per_listing_cost,
        scheduler_config: config.scheduler.clone(),
    })
}
