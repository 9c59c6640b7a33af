//! ImprovementProfile persistence (§4.9-§4.10): one row per listing,
//! replaced wholesale on each re-aggregation rather than versioned — the
//! profile is a derived snapshot, not an append-only log.

use crate::error::Result;
use crate::review::ImprovementProfile;
use async_trait::async_trait;
use smartacus_core::DatabasePool;

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn upsert_improvement_profile(&self, profile: &ImprovementProfile) -> Result<()>;
    async fn get_improvement_profile(&self, listing_id: &str) -> Result<Option<ImprovementProfile>>;
}

pub struct PostgresReviewStore {
    db: DatabasePool,
}

impl PostgresReviewStore {
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }

    fn pool(&self) -> &sqlx::PgPool {
        self.db.handle()
    }
}

#[async_trait]
impl ReviewStore for PostgresReviewStore {
    async fn upsert_improvement_profile(&self, profile: &ImprovementProfile) -> Result<()> {
        let top_defects = serde_json::to_value(&profile.top_defects)?;
        let top_feature_requests = serde_json::to_value(&profile.top_feature_requests)?;
        sqlx::query(
            r#"
            INSERT INTO improvement_profiles (
                listing_id, top_defects, top_feature_requests, dominant_pain,
                improvement_score, reviews_analyzed, negative_reviews_analyzed, reviews_ready
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (listing_id) DO UPDATE SET
                top_defects = EXCLUDED.top_defects,
                top_feature_requests = EXCLUDED.top_feature_requests,
                dominant_pain = EXCLUDED.dominant_pain,
                improvement_score = EXCLUDED.improvement_score,
                reviews_analyzed = EXCLUDED.reviews_analyzed,
                negative_reviews_analyzed = EXCLUDED.negative_reviews_analyzed,
                reviews_ready = EXCLUDED.reviews_ready
            "#,
        )
        .bind(&profile.listing_id)
        .bind(top_defects)
        .bind(top_feature_requests)
        .bind(profile.dominant_pain)
        .bind(profile.improvement_score)
        .bind(profile.reviews_analyzed)
        .bind(profile.negative_reviews_analyzed)
        .bind(profile.reviews_ready)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn get_improvement_profile(&self, listing_id: &str) -> Result<Option<ImprovementProfile>> {
        let row = sqlx::query_as::<_, ImprovementProfileRow>(
            "SELECT * FROM improvement_profiles WHERE listing_id = $1",
        )
        .bind(listing_id)
        .fetch_optional(self.pool())
        .await?;
        row.map(TryInto::try_into).transpose()
    }
}

/// Wire shape matching the table's JSON columns, converted to the domain
/// type after fetch rather than deriving `FromRow` directly on
/// `ImprovementProfile` (whose `top_defects`/`top_feature_requests` are
/// typed `Vec<T>`, not `serde_json::Value`).
#[derive(sqlx::FromRow)]
struct ImprovementProfileRow {
    listing_id: String,
    top_defects: serde_json::Value,
    top_feature_requests: serde_json::Value,
    dominant_pain: Option<crate::review::DefectType>,
    improvement_score: f64,
    reviews_analyzed: i32,
    negative_reviews_analyzed: i32,
    reviews_ready: bool,
}

impl TryFrom<ImprovementProfileRow> for ImprovementProfile {
    type Error = crate::error::DomainError;

    fn try_from(row: ImprovementProfileRow) -> std::result::Result<Self, Self::Error> {
        Ok(ImprovementProfile {
            listing_id: row.listing_id,
            top_defects: serde_json::from_value(row.top_defects)?,
            top_feature_requests: serde_json::from_value(row.top_feature_requests)?,
            dominant_pain: row.dominant_pain,
            improvement_score: row.improvement_score,
            reviews_analyzed: row.reviews_analyzed,
            negative_reviews_analyzed: row.negative_reviews_analyzed,
            reviews_ready: row.reviews_ready,
        })
    }
}

#[derive(Default)]
pub struct InMemoryReviewStore {
    profiles: tokio::sync::Mutex<std::collections::HashMap<String, ImprovementProfile>>,
}

impl InMemoryReviewStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReviewStore for InMemoryReviewStore {
    async fn upsert_improvement_profile(&self, profile: &ImprovementProfile) -> Result<()> {
        self.profiles.lock().await.insert(profile.listing_id.clone(), profile.clone());
        Ok(())
    }

    async fn get_improvement_profile(&self, listing_id: &str) -> Result<Option<ImprovementProfile>> {
        Ok(self.profiles.lock().await.get(listing_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_then_get_round_trips() {
        let store = InMemoryReviewStore::new();
        let profile = ImprovementProfile::empty("L1");
        store.upsert_improvement_profile(&profile).await.unwrap();
        let fetched = store.get_improvement_profile("L1").await.unwrap().unwrap();
        assert_eq!(fetched.listing_id, "L1");
    }
}
