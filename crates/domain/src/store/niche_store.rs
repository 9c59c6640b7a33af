//! Niche registry and per-cycle performance history, read by the strategy
//! agent to compute scan priority and momentum (§4.12).

use crate::error::Result;
use crate::niche::{Niche, NichePerformanceRecord};
use async_trait::async_trait;
use smartacus_core::DatabasePool;

#[async_trait]
pub trait NicheStore: Send + Sync {
    async fn list_active_niches(&self) -> Result<Vec<Niche>>;
    async fn upsert_niche(&self, niche: &Niche) -> Result<()>;
    async fn mark_scanned(&self, category_id: &str, marketplace_domain: i32, scanned_at: chrono::DateTime<chrono::Utc>) -> Result<()>;
    async fn record_performance(&self, record: &NichePerformanceRecord) -> Result<()>;
    async fn performance_history(&self, category_id: &str, marketplace_domain: i32, limit: i64) -> Result<Vec<NichePerformanceRecord>>;
}

pub struct PostgresNicheStore {
    db: DatabasePool,
}

impl PostgresNicheStore {
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }

    fn pool(&self) -> &sqlx::PgPool {
        self.db.handle()
    }
}

#[async_trait]
impl NicheStore for PostgresNicheStore {
    async fn list_active_niches(&self) -> Result<Vec<Niche>> {
        let niches = sqlx::query_as::<_, Niche>("SELECT * FROM niches WHERE is_active = true ORDER BY priority DESC")
            .fetch_all(self.pool())
            .await?;
        Ok(niches)
    }

    async fn upsert_niche(&self, niche: &Niche) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO niches (
                category_id, marketplace_domain, name, path, priority, is_active,
                total_runs, total_opportunities_found, conversion_rate, last_scanned_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (category_id, marketplace_domain) DO UPDATE SET
                name = EXCLUDED.name,
                path = EXCLUDED.path,
                priority = EXCLUDED.priority,
                is_active = EXCLUDED.is_active
            "#,
        )
        .bind(&niche.category_id)
        .bind(niche.marketplace_domain)
        .bind(&niche.name)
        .bind(&niche.path)
        .bind(niche.priority)
        .bind(niche.is_active)
        .bind(niche.total_runs)
        .bind(niche.total_opportunities_found)
        .bind(niche.conversion_rate)
        .bind(niche.last_scanned_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn mark_scanned(&self, category_id: &str, marketplace_domain: i32, scanned_at: chrono::DateTime<chrono::Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE niches SET last_scanned_at = $3, total_runs = total_runs + 1
            WHERE category_id = $1 AND marketplace_domain = $2
            "#,
        )
        .bind(category_id)
        .bind(marketplace_domain)
        .bind(scanned_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn record_performance(&self, record: &NichePerformanceRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO niche_performance_history (
                category_id, marketplace_domain, cycle_id, recorded_at, tokens_used,
                opportunities_found, avg_opportunity_score, conversion_rate
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&record.category_id)
        .bind(record.marketplace_domain)
        .bind(record.cycle_id)
        .bind(record.recorded_at)
        .bind(record.tokens_used)
        .bind(record.opportunities_found)
        .bind(record.avg_opportunity_score)
        .bind(record.conversion_rate)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn performance_history(&self, category_id: &str, marketplace_domain: i32, limit: i64) -> Result<Vec<NichePerformanceRecord>> {
        let records = sqlx::query_as::<_, NichePerformanceRecord>(
            r#"
            SELECT * FROM niche_performance_history
            WHERE category_id = $1 AND marketplace_domain = $2
            ORDER BY recorded_at DESC
            LIMIT $3
            "#,
        )
        .bind(category_id)
        .bind(marketplace_domain)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(records)
    }
}

#[derive(Default)]
pub struct InMemoryNicheStore {
    niches: tokio::sync::Mutex<std::collections::HashMap<(String, i32), Niche>>,
    history: tokio::sync::Mutex<Vec<NichePerformanceRecord>>,
}

impl InMemoryNicheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NicheStore for InMemoryNicheStore {
    async fn list_active_niches(&self) -> Result<Vec<Niche>> {
        let guard = self.niches.lock().await;
        let mut niches: Vec<Niche> = guard.values().filter(|n| n.is_active).cloned().collect();
        niches.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(niches)
    }

    async fn upsert_niche(&self, niche: &Niche) -> Result<()> {
        self.niches
            .lock()
            .await
            .insert((niche.category_id.clone(), niche.marketplace_domain), niche.clone());
        Ok(())
    }

    async fn mark_scanned(&self, category_id: &str, marketplace_domain: i32, scanned_at: chrono::DateTime<chrono::Utc>) -> Result<()> {
        if let Some(niche) = self.niches.lock().await.get_mut(&(category_id.to_string(), marketplace_domain)) {
            niche.last_scanned_at = Some(scanned_at);
            niche.total_runs += 1;
        }
        Ok(())
    }

    async fn record_performance(&self, record: &NichePerformanceRecord) -> Result<()> {
        self.history.lock().await.push(record.clone());
        Ok(())
    }

    async fn performance_history(&self, category_id: &str, marketplace_domain: i32, limit: i64) -> Result<Vec<NichePerformanceRecord>> {
        let guard = self.history.lock().await;
        let mut matches: Vec<NichePerformanceRecord> = guard
            .iter()
            .filter(|r| r.category_id == category_id && r.marketplace_domain == marketplace_domain)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        matches.truncate(limit.max(0) as usize);
        Ok(matches)
    }
}
