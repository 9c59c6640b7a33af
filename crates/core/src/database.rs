//! # Database Pool
//!
//! Smartacus is single-tenant (Non-goal: "multi-tenant isolation"), so this
//! is a plain wrapper around one `sqlx::PgPool` rather than the
//! schema-per-tenant cache a multi-tenant system would need. The pool is
//! constructed once at process start and passed by value — it is cheap to
//! clone, per `sqlx::PgPool`'s internal `Arc` — through the orchestrator for
//! the duration of one cycle (§5: "a pool handle passed explicitly through
//! the orchestrator").

use crate::config::DatabaseConfig;
use crate::error::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;

#[derive(Clone)]
pub struct DatabasePool {
    pub pool: PgPool,
}

impl DatabasePool {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "connecting to database"
        );
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&config.url)
            .await?;
        Ok(Self { pool })
    }

    pub fn handle(&self) -> &PgPool {
        &self.pool
    }

    /// Lightweight liveness probe used by the CLI's health check and by the
    /// scheduler before starting a cycle.
    pub async fn health(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
