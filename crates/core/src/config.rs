//! # Configuration Management
//!
//! Hierarchical configuration, loaded the same way the source ERP template
//! loads it: environment-specific TOML overrides a default TOML, and
//! environment variables override both.
//!
//! 1. `config/default.toml` (lowest precedence)
//! 2. `config/{environment}.toml`
//! 3. Environment variables prefixed `SMARTACUS__`, double-underscore
//!    separated (e.g. `SMARTACUS__CATALOG__TOKENS_PER_MINUTE=300`)
//!    (highest precedence)
//!
//! Every field named in the specification's configuration surface is a
//! concrete struct field with a documented default — there is no
//! runtime-extensible key/value bag. Unknown top-level sections are
//! rejected by `validate()`, but unknown leaf keys within a recognized
//! section are accepted the way the ERP template's config module accepts
//! them, to tolerate operators rolling forward a newer example file against
//! an older binary.

use crate::error::{CoreError, Result};
use config::{Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub budget: BudgetConfig,
    pub ingestion: IngestionConfig,
    pub scoring: ScoringConfig,
    pub scheduler: SchedulerConfig,
    pub reviews: ReviewsConfig,
    pub database: DatabaseConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://smartacus_app@localhost:5432/smartacus".to_string(),
            max_connections: 10,
            min_connections: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub environment: String,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Remote catalog provider parameters (§6, C1).
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub api_key: String,
    pub base_url: String,
    pub tokens_per_minute: u32,
    pub max_retries: u32,
    pub request_timeout_s: u64,
    pub marketplace_domain_id: u32,
    pub max_retry_delay_s: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.catalog.smartacus.internal/v1/products".to_string(),
            tokens_per_minute: 200,
            max_retries: 3,
            request_timeout_s: 120,
            marketplace_domain_id: 1,
            max_retry_delay_s: 60,
        }
    }
}

/// Monthly token budget parameters (§6, C2).
#[derive(Debug, Clone, Deserialize)]
pub struct BudgetConfig {
    pub monthly_limit: i64,
    pub per_listing_cost: i64,
    pub per_discovery_cost: i64,
    pub discovery_allocation_percent: f64,
    pub scanning_allocation_percent: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            monthly_limit: 900_000,
            per_listing_cost: 2,
            per_discovery_cost: 5,
            discovery_allocation_percent: 20.0,
            scanning_allocation_percent: 80.0,
        }
    }
}

/// Ingestion pipeline parameters (§6, C3).
#[derive(Debug, Clone, Deserialize)]
pub struct IngestionConfig {
    pub batch_size: usize,
    pub freshness_hours: i64,
    pub target_listing_count: usize,
    pub min_price: rust_decimal::Decimal,
    pub max_price: rust_decimal::Decimal,
    pub min_review_count: i32,
    pub min_rating: rust_decimal::Decimal,
    pub min_bsr: i64,
    pub max_bsr: i64,
    pub deactivate_after_hours: i64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        use rust_decimal::Decimal;
        Self {
            batch_size: 100,
            freshness_hours: 24,
            target_listing_count: 10_000,
            min_price: Decimal::new(500, 2),
            max_price: Decimal::new(10000, 2),
            min_review_count: 10,
            min_rating: Decimal::new(30, 1),
            min_bsr: 1,
            max_bsr: 500_000,
            deactivate_after_hours: 24 * 14,
        }
    }
}

/// Deterministic scoring thresholds (§4.6). Immutable once loaded; a
/// [`ScoringConfig::validate`] failure is a startup `ValidationError`, never
/// a runtime one.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    pub margin_max: u32,
    pub velocity_max: u32,
    pub competition_max: u32,
    pub gap_max: u32,
    pub time_pressure_max: u32,
    pub time_pressure_gate: u32,
    pub platform_fee_percent: rust_decimal::Decimal,
    pub platform_fee_floor: rust_decimal::Decimal,
    pub referral_percent: rust_decimal::Decimal,
    pub default_return_rate: rust_decimal::Decimal,
    pub default_ad_percent: rust_decimal::Decimal,
    pub default_storage_provision: rust_decimal::Decimal,
    pub default_risk_factor: rust_decimal::Decimal,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        use rust_decimal::Decimal;
        Self {
            margin_max: 30,
            velocity_max: 25,
            competition_max: 20,
            gap_max: 15,
            time_pressure_max: 10,
            time_pressure_gate: 3,
            platform_fee_percent: Decimal::new(15, 2),
            platform_fee_floor: Decimal::new(300, 2),
            referral_percent: Decimal::new(8, 2),
            default_return_rate: Decimal::new(5, 2),
            default_ad_percent: Decimal::new(10, 2),
            default_storage_provision: Decimal::new(2, 2),
            default_risk_factor: Decimal::new(30, 2),
        }
    }
}

impl ScoringConfig {
    /// The five component maxima must sum to exactly 100 (§4.6). This is
    /// checked once at startup, never at runtime.
    pub fn validate(&self) -> Result<()> {
        let total =
            self.margin_max + self.velocity_max + self.competition_max + self.gap_max + self.time_pressure_max;
        if total != 100 {
            return Err(CoreError::Validation(format!(
                "scoring component maxima must sum to 100, got {total}"
            )));
        }
        if self.time_pressure_gate > self.time_pressure_max {
            return Err(CoreError::Validation(
                "time_pressure_gate cannot exceed time_pressure_max".to_string(),
            ));
        }
        Ok(())
    }
}

/// Scheduler pacing parameters (§6, C13).
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    pub run_interval_hours: i64,
    pub min_tokens_per_run: i64,
    pub max_niches_per_run: usize,
    pub max_listings_per_niche: usize,
    pub stage_soft_timeout_s: u64,
    pub cycle_soft_ceiling_s: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            run_interval_hours: 24,
            min_tokens_per_run: 50,
            max_niches_per_run: 5,
            max_listings_per_niche: 100,
            stage_soft_timeout_s: 600,
            cycle_soft_ceiling_s: 2 * 60 * 60,
        }
    }
}

/// Review ingestion + extraction parameters (§6, C9-C11).
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewsConfig {
    pub vertical: String,
    pub max_job_wait_s: u64,
    pub min_required_reviews: usize,
    pub max_reviews_cap: usize,
    pub mapping_version: String,
}

impl Default for ReviewsConfig {
    fn default() -> Self {
        Self {
            vertical: "generic_hardware".to_string(),
            max_job_wait_s: 120,
            min_required_reviews: 30,
            max_reviews_cap: 500,
            mapping_version: "spec-mapping-v1".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from `config/default.toml`, an optional
    /// environment-specific override, and environment variables, in that
    /// order of increasing precedence. Fails fast on startup-only
    /// validation errors (§7 `ValidationError`).
    pub fn load() -> Result<Self> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let builder = config::Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(Environment::with_prefix("SMARTACUS").separator("__"));

        let built = builder.build()?;
        let cfg: Config = built.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        self.scoring.validate()?;
        if self.budget.monthly_limit < 0 {
            return Err(CoreError::Validation("budget.monthly_limit must be >= 0".to_string()));
        }
        if self.ingestion.batch_size == 0 || self.ingestion.batch_size > 100 {
            return Err(CoreError::Validation(
                "ingestion.batch_size must be in 1..=100 (remote API batches at 100)".to_string(),
            ));
        }
        if self.scheduler.max_niches_per_run == 0 {
            return Err(CoreError::Validation(
                "scheduler.max_niches_per_run must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}
