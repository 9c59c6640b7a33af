//! Ingestion pipeline (§4.3, C3): discover → freshness filter → criteria
//! filter → batch fetch → upsert → snapshot insert → refresh views. Every
//! batch is isolated — a batch's failure accumulates into the result's
//! error list rather than aborting the remaining batches (§7).

use chrono::Utc;
use smartacus_catalog::CatalogClient;
use smartacus_core::config::IngestionConfig;
use smartacus_domain::store::ListingStore;
use smartacus_domain::UpsertListing;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct IngestionResult {
    pub discovered: usize,
    pub fresh_filtered_out: usize,
    pub criteria_filtered_out: usize,
    pub fetched: usize,
    pub upserted: usize,
    pub snapshots_inserted: usize,
    pub tokens_used: f64,
    pub errors: Vec<String>,
}

pub struct IngestionRequest {
    pub explicit_listing_ids: Option<Vec<String>>,
    pub category_id: Option<String>,
    pub skip_discovery: bool,
    pub skip_filtering: bool,
    pub max_listings: usize,
}

pub struct IngestionPipeline {
    catalog: Arc<dyn CatalogClient>,
    listings: Arc<dyn ListingStore>,
    config: IngestionConfig,
}

impl IngestionPipeline {
    pub fn new(catalog: Arc<dyn CatalogClient>, listings: Arc<dyn ListingStore>, config: IngestionConfig) -> Self {
        Self { catalog, listings, config }
    }

    pub async fn run(&self, request: IngestionRequest) -> IngestionResult {
        let mut result = IngestionResult::default();

        let discovered = if request.skip_discovery {
            request.explicit_listing_ids.clone().unwrap_or_default()
        } else {
            match &request.category_id {
                Some(category_id) => match self.catalog.category_listings(category_id, 1).await {
                    Ok(ids) => ids,
                    Err(e) => {
                        result.errors.push(format!("discovery failed: {e}"));
                        Vec::new()
                    }
                },
                None => request.explicit_listing_ids.clone().unwrap_or_default(),
            }
        };
        result.discovered = discovered.len();

        let fresh = self.freshness_filter(discovered).await;
        result.fresh_filtered_out = result.discovered - fresh.len();

        let candidates = if request.skip_filtering {
            fresh
        } else {
            let filtered = self.criteria_filter(fresh.clone()).await;
            result.criteria_filtered_out = fresh.len() - filtered.len();
            filtered
        };

        let capped: Vec<String> = candidates.into_iter().take(request.max_listings.max(1)).collect();

        for batch in capped.chunks(self.config.batch_size) {
            match self.catalog.fetch_products(batch, true, true).await {
                Ok(products) => {
                    result.fetched += products.len();
                    for product in &products {
                        match self.upsert_one(&product.listing).await {
                            Ok(()) => result.upserted += 1,
                            Err(e) => result.errors.push(format!("{}: upsert failed: {e}", product.listing.listing_id)),
                        }
                        match self.listings.insert_snapshot(&product.snapshot).await {
                            Ok(()) => result.snapshots_inserted += 1,
                            Err(e) => result.errors.push(format!("{}: snapshot insert failed: {e}", product.listing.listing_id)),
                        }
                    }
                    result.tokens_used += batch.len() as f64 * 3.0;
                }
                Err(e) => {
                    warn!(batch_size = batch.len(), error = %e, "batch fetch failed, continuing to next batch");
                    result.errors.push(format!("batch fetch failed: {e}"));
                }
            }
        }

        self.deactivate_stale().await.unwrap_or_else(|e| {
            result.errors.push(format!("deactivate_stale failed: {e}"));
            0
        });

        info!(
            discovered = result.discovered,
            fetched = result.fetched,
            upserted = result.upserted,
            errors = result.errors.len(),
            "ingestion cycle complete"
        );
        result
    }

    async fn freshness_filter(&self, ids: Vec<String>) -> Vec<String> {
        let threshold = chrono::Duration::hours(self.config.freshness_hours);
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let stale = match self.listings.latest_snapshot(&id).await {
                Ok(Some(snap)) => Utc::now() - snap.captured_at > threshold,
                Ok(None) => true,
                Err(_) => true,
            };
            if stale {
                out.push(id);
            }
        }
        out
    }

    async fn criteria_filter(&self, ids: Vec<String>) -> Vec<String> {
        if ids.is_empty() {
            return ids;
        }
        let basics = match self.catalog.fetch_products(&ids, false, false).await {
            Ok(products) => products,
            Err(_) => return Vec::new(),
        };
        basics
            .into_iter()
            .filter(|p| {
                let snap = &p.snapshot;
                snap.current_price >= self.config.min_price
                    && snap.current_price <= self.config.max_price
                    && snap.review_count >= self.config.min_review_count
                    && snap.rating_average.map(|r| r >= self.config.min_rating).unwrap_or(false)
                    && snap.bsr.map(|b| b >= self.config.min_bsr && b <= self.config.max_bsr).unwrap_or(false)
            })
            .map(|p| p.listing.listing_id)
            .collect()
    }

    async fn upsert_one(&self, listing: &UpsertListing) -> smartacus_domain::Result<()> {
        self.listings.upsert_listing(listing, Utc::now()).await?;
        Ok(())
    }

    async fn deactivate_stale(&self) -> smartacus_domain::Result<u64> {
        let threshold = chrono::Duration::hours(self.config.deactivate_after_hours);
        self.listings.deactivate_stale(Utc::now(), threshold).await
    }
}
