//! Pipeline-run metrics persistence (§4.14, supplemented per
//! `src/orchestrator/monitoring.py` — one row per cycle, written once at
//! cycle end, carrying each stage's outcome and duration).

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smartacus_core::DatabasePool;
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "stage_outcome", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Completed,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub stage_name: String,
    pub outcome: StageOutcome,
    pub duration_ms: i64,
    pub items_processed: i64,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PipelineRunRecord {
    pub cycle_id: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub overall_outcome: StageOutcome,
    pub stage_results: serde_json::Value,
    pub tokens_used: i64,
    pub opportunities_found: i32,
    pub categories_scanned: i32,
}

impl PipelineRunRecord {
    pub fn new(cycle_id: i64, started_at: DateTime<Utc>, finished_at: DateTime<Utc>, stages: &[StageResult]) -> Self {
        let overall_outcome = if stages.iter().any(|s| s.outcome == StageOutcome::Failed) {
            StageOutcome::Failed
        } else if stages.iter().all(|s| s.outcome == StageOutcome::Skipped) {
            StageOutcome::Skipped
        } else {
            StageOutcome::Completed
        };
        Self {
            cycle_id,
            started_at,
            finished_at,
            overall_outcome,
            stage_results: serde_json::to_value(stages).unwrap_or_default(),
            tokens_used: 0,
            opportunities_found: 0,
            categories_scanned: 0,
        }
    }
}

#[async_trait]
pub trait PipelineRunStore: Send + Sync {
    async fn insert_run(&self, record: &PipelineRunRecord) -> Result<()>;
    async fn recent_runs(&self, limit: i64) -> Result<Vec<PipelineRunRecord>>;
}

pub struct PostgresPipelineRunStore {
    db: DatabasePool,
}

impl PostgresPipelineRunStore {
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }

    fn pool(&self) -> &sqlx::PgPool {
        self.db.handle()
    }
}

#[async_trait]
impl PipelineRunStore for PostgresPipelineRunStore {
    async fn insert_run(&self, record: &PipelineRunRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pipeline_runs (
                cycle_id, started_at, finished_at, overall_outcome, stage_results,
                tokens_used, opportunities_found, categories_scanned
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.cycle_id)
        .bind(record.started_at)
        .bind(record.finished_at)
        .bind(record.overall_outcome)
        .bind(&record.stage_results)
        .bind(record.tokens_used)
        .bind(record.opportunities_found)
        .bind(record.categories_scanned)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn recent_runs(&self, limit: i64) -> Result<Vec<PipelineRunRecord>> {
        let runs = sqlx::query_as::<_, PipelineRunRecord>(
            "SELECT * FROM pipeline_runs ORDER BY cycle_id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(runs)
    }
}

#[derive(Default)]
pub struct InMemoryPipelineRunStore {
    runs: tokio::sync::Mutex<Vec<PipelineRunRecord>>,
}

impl InMemoryPipelineRunStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PipelineRunStore for InMemoryPipelineRunStore {
    async fn insert_run(&self, record: &PipelineRunRecord) -> Result<()> {
        self.runs.lock().await.push(record.clone());
        Ok(())
    }

    async fn recent_runs(&self, limit: i64) -> Result<Vec<PipelineRunRecord>> {
        let guard = self.runs.lock().await;
        let mut runs = guard.clone();
        runs.sort_by(|a, b| b.cycle_id.cmp(&a.cycle_id));
        runs.truncate(limit.max(0) as usize);
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_outcome_failed_dominates() {
        let stages = vec![
            StageResult { stage_name: "ingest".to_string(), outcome: StageOutcome::Completed, duration_ms: 10, items_processed: 5, error_message: None },
            StageResult { stage_name: "score".to_string(), outcome: StageOutcome::Failed, duration_ms: 5, items_processed: 0, error_message: Some("boom".to_string()) },
        ];
        let record = PipelineRunRecord::new(1, Utc::now(), Utc::now(), &stages);
        assert_eq!(record.overall_outcome, StageOutcome::Failed);
    }

    #[test]
    fn test_overall_outcome_all_skipped() {
        let stages = vec![
            StageResult { stage_name: "ingest".to_string(), outcome: StageOutcome::Skipped, duration_ms: 0, items_processed: 0, error_message: None },
        ];
        let record = PipelineRunRecord::new(1, Utc::now(), Utc::now(), &stages);
        assert_eq!(record.overall_outcome, StageOutcome::Skipped);
    }
}
