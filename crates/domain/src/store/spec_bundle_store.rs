//! SpecBundle persistence (§4.11). Bundles are versioned by
//! `(listing_id, generated_at)`; the latest row per listing is what
//! supplier-outreach tooling reads.

use crate::error::Result;
use crate::spec_bundle::SpecBundle;
use async_trait::async_trait;
use smartacus_core::DatabasePool;

#[async_trait]
pub trait SpecBundleStore: Send + Sync {
    async fn insert_spec_bundle(&self, bundle: &SpecBundle) -> Result<()>;
    async fn latest_spec_bundle(&self, listing_id: &str) -> Result<Option<SpecBundle>>;
}

pub struct PostgresSpecBundleStore {
    db: DatabasePool,
}

impl PostgresSpecBundleStore {
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }

    fn pool(&self) -> &sqlx::PgPool {
        self.db.handle()
    }
}

#[async_trait]
impl SpecBundleStore for PostgresSpecBundleStore {
    async fn insert_spec_bundle(&self, bundle: &SpecBundle) -> Result<()> {
        let bloc_a = serde_json::to_value(&bundle.bloc_a)?;
        let bloc_b = serde_json::to_value(&bundle.bloc_b)?;
        let qc_checklist = serde_json::to_value(&bundle.qc_checklist)?;
        sqlx::query(
            r#"
            INSERT INTO spec_bundles (
                listing_id, run_id, generated_at, bloc_a, bloc_b, qc_checklist,
                oem_spec_text, qc_checklist_text, supplier_outreach_subject,
                supplier_outreach_body, mapping_version, inputs_hash
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(&bundle.listing_id)
        .bind(&bundle.run_id)
        .bind(bundle.generated_at)
        .bind(bloc_a)
        .bind(bloc_b)
        .bind(qc_checklist)
        .bind(&bundle.oem_spec_text)
        .bind(&bundle.qc_checklist_text)
        .bind(&bundle.supplier_outreach_subject)
        .bind(&bundle.supplier_outreach_body)
        .bind(&bundle.mapping_version)
        .bind(&bundle.inputs_hash)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn latest_spec_bundle(&self, listing_id: &str) -> Result<Option<SpecBundle>> {
        let row = sqlx::query_as::<_, SpecBundleRow>(
            "SELECT * FROM spec_bundles WHERE listing_id = $1 ORDER BY generated_at DESC LIMIT 1",
        )
        .bind(listing_id)
        .fetch_optional(self.pool())
        .await?;
        row.map(TryInto::try_into).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct SpecBundleRow {
    listing_id: String,
    run_id: Option<String>,
    generated_at: chrono::DateTime<chrono::Utc>,
    bloc_a: serde_json::Value,
    bloc_b: serde_json::Value,
    qc_checklist: serde_json::Value,
    oem_spec_text: String,
    qc_checklist_text: String,
    supplier_outreach_subject: String,
    supplier_outreach_body: String,
    mapping_version: String,
    inputs_hash: String,
}

impl TryFrom<SpecBundleRow> for SpecBundle {
    type Error = crate::error::DomainError;

    fn try_from(row: SpecBundleRow) -> std::result::Result<Self, Self::Error> {
        Ok(SpecBundle {
            listing_id: row.listing_id,
            run_id: row.run_id,
            generated_at: row.generated_at,
            bloc_a: serde_json::from_value(row.bloc_a)?,
            bloc_b: serde_json::from_value(row.bloc_b)?,
            qc_checklist: serde_json::from_value(row.qc_checklist)?,
            oem_spec_text: row.oem_spec_text,
            qc_checklist_text: row.qc_checklist_text,
            supplier_outreach_subject: row.supplier_outreach_subject,
            supplier_outreach_body: row.supplier_outreach_body,
            mapping_version: row.mapping_version,
            inputs_hash: row.inputs_hash,
        })
    }
}

#[derive(Default)]
pub struct InMemorySpecBundleStore {
    bundles: tokio::sync::Mutex<Vec<SpecBundle>>,
}

impl InMemorySpecBundleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SpecBundleStore for InMemorySpecBundleStore {
    async fn insert_spec_bundle(&self, bundle: &SpecBundle) -> Result<()> {
        self.bundles.lock().await.push(bundle.clone());
        Ok(())
    }

    async fn latest_spec_bundle(&self, listing_id: &str) -> Result<Option<SpecBundle>> {
        let guard = self.bundles.lock().await;
        Ok(guard
            .iter()
            .filter(|b| b.listing_id == listing_id)
            .max_by_key(|b| b.generated_at)
            .cloned())
    }
}
