//! Listing + Snapshot persistence (§6 store contract: idempotent upsert by
//! primary key, append-only inserts, secondary-index queries).

use crate::error::Result;
use crate::listing::{Listing, UpsertListing};
use crate::snapshot::Snapshot;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use smartacus_core::{DatabasePool, PaginationOptions, PaginationResult};
use sqlx::Row;

#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn upsert_listing(&self, listing: &UpsertListing, seen_at: DateTime<Utc>) -> Result<Listing>;
    async fn get_listing(&self, listing_id: &str) -> Result<Option<Listing>>;
    async fn list_active_listings(&self, pagination: PaginationOptions) -> Result<PaginationResult<Listing>>;
    async fn deactivate_stale(&self, now: DateTime<Utc>, deactivate_after: chrono::Duration) -> Result<u64>;

    async fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<()>;
    async fn latest_snapshot(&self, listing_id: &str) -> Result<Option<Snapshot>>;
    /// Two most recent snapshots, newest first, used by the event detector
    /// which only ever compares adjacent pairs.
    async fn last_two_snapshots(&self, listing_id: &str) -> Result<Vec<Snapshot>>;
    async fn snapshot_history(&self, listing_id: &str, since: DateTime<Utc>) -> Result<Vec<Snapshot>>;
}

pub struct PostgresListingStore {
    db: DatabasePool,
}

impl PostgresListingStore {
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }

    fn pool(&self) -> &sqlx::PgPool {
        self.db.handle()
    }
}

#[async_trait]
impl ListingStore for PostgresListingStore {
    async fn upsert_listing(&self, listing: &UpsertListing, seen_at: DateTime<Utc>) -> Result<Listing> {
        let category_path = serde_json::json!(listing.category_path);
        let row = sqlx::query(
            r#"
            INSERT INTO listings (
                listing_id, title, brand, manufacturer, model, category_path,
                weight, dimensions, image_url, flags, is_active, last_seen_at,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, true, $11, $11, $11)
            ON CONFLICT (listing_id) DO UPDATE SET
                title = EXCLUDED.title,
                brand = EXCLUDED.brand,
                manufacturer = EXCLUDED.manufacturer,
                model = EXCLUDED.model,
                category_path = EXCLUDED.category_path,
                weight = EXCLUDED.weight,
                dimensions = EXCLUDED.dimensions,
                image_url = EXCLUDED.image_url,
                flags = EXCLUDED.flags,
                is_active = true,
                last_seen_at = EXCLUDED.last_seen_at,
                updated_at = EXCLUDED.last_seen_at
            RETURNING *
            "#,
        )
        .bind(&listing.listing_id)
        .bind(&listing.title)
        .bind(&listing.brand)
        .bind(&listing.manufacturer)
        .bind(&listing.model)
        .bind(&category_path)
        .bind(listing.weight)
        .bind(&listing.dimensions)
        .bind(&listing.image_url)
        .bind(&listing.flags)
        .bind(seen_at)
        .fetch_one(self.pool())
        .await?;

        Ok(row_to_listing(row))
    }

    async fn get_listing(&self, listing_id: &str) -> Result<Option<Listing>> {
        let row = sqlx::query("SELECT * FROM listings WHERE listing_id = $1")
            .bind(listing_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(row_to_listing))
    }

    async fn list_active_listings(&self, pagination: PaginationOptions) -> Result<PaginationResult<Listing>> {
        let offset = (pagination.page - 1).max(0) * pagination.limit;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM listings WHERE is_active = true")
            .fetch_one(self.pool())
            .await?;
        let rows = sqlx::query("SELECT * FROM listings WHERE is_active = true ORDER BY listing_id LIMIT $1 OFFSET $2")
            .bind(pagination.limit)
            .bind(offset)
            .fetch_all(self.pool())
            .await?;
        let items = rows.into_iter().map(row_to_listing).collect();
        Ok(PaginationResult::new(items, total, pagination))
    }

    async fn deactivate_stale(&self, now: DateTime<Utc>, deactivate_after: chrono::Duration) -> Result<u64> {
        let cutoff = now - deactivate_after;
        let result = sqlx::query(
            "UPDATE listings SET is_active = false, updated_at = $2 WHERE is_active = true AND last_seen_at < $1",
        )
        .bind(cutoff)
        .bind(now)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected())
    }

    async fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO snapshots (
                listing_id, captured_at, current_price, list_price, lowest_new,
                lowest_used, currency, bsr, bsr_category, stock_status,
                fulfillment_type, seller_count, rating_average, review_count,
                rating_histogram, ingestion_session_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (listing_id, captured_at) DO NOTHING
            "#,
        )
        .bind(&snapshot.listing_id)
        .bind(snapshot.captured_at)
        .bind(snapshot.current_price)
        .bind(snapshot.list_price)
        .bind(snapshot.lowest_new)
        .bind(snapshot.lowest_used)
        .bind(&snapshot.currency)
        .bind(snapshot.bsr)
        .bind(&snapshot.bsr_category)
        .bind(snapshot.stock_status)
        .bind(snapshot.fulfillment_type)
        .bind(snapshot.seller_count)
        .bind(snapshot.rating_average)
        .bind(snapshot.review_count)
        .bind(&snapshot.rating_histogram)
        .bind(&snapshot.ingestion_session_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn latest_snapshot(&self, listing_id: &str) -> Result<Option<Snapshot>> {
        let snapshot = sqlx::query_as::<_, Snapshot>(
            "SELECT * FROM snapshots WHERE listing_id = $1 ORDER BY captured_at DESC LIMIT 1",
        )
        .bind(listing_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(snapshot)
    }

    async fn last_two_snapshots(&self, listing_id: &str) -> Result<Vec<Snapshot>> {
        let snapshots = sqlx::query_as::<_, Snapshot>(
            "SELECT * FROM snapshots WHERE listing_id = $1 ORDER BY captured_at DESC LIMIT 2",
        )
        .bind(listing_id)
        .fetch_all(self.pool())
        .await?;
        Ok(snapshots)
    }

    async fn snapshot_history(&self, listing_id: &str, since: DateTime<Utc>) -> Result<Vec<Snapshot>> {
        let snapshots = sqlx::query_as::<_, Snapshot>(
            "SELECT * FROM snapshots WHERE listing_id = $1 AND captured_at >= $2 ORDER BY captured_at ASC",
        )
        .bind(listing_id)
        .bind(since)
        .fetch_all(self.pool())
        .await?;
        Ok(snapshots)
    }
}

fn row_to_listing(row: sqlx::postgres::PgRow) -> Listing {
    Listing {
        listing_id: row.get("listing_id"),
        title: row.get("title"),
        brand: row.get("brand"),
        manufacturer: row.get("manufacturer"),
        model: row.get("model"),
        category_path: row.get("category_path"),
        weight: row.get("weight"),
        dimensions: row.get("dimensions"),
        image_url: row.get("image_url"),
        flags: row.get("flags"),
        is_active: row.get("is_active"),
        last_seen_at: row.get("last_seen_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Hand-written in-memory fake for unit tests that exercise ingestion logic
/// without a database (§6 test tooling: no mocking framework).
pub struct InMemoryListingStore {
    listings: tokio::sync::Mutex<std::collections::HashMap<String, Listing>>,
    snapshots: tokio::sync::Mutex<std::collections::HashMap<String, Vec<Snapshot>>>,
}

impl InMemoryListingStore {
    pub fn new() -> Self {
        Self {
            listings: tokio::sync::Mutex::new(std::collections::HashMap::new()),
            snapshots: tokio::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }
}

impl Default for InMemoryListingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ListingStore for InMemoryListingStore {
    async fn upsert_listing(&self, listing: &UpsertListing, seen_at: DateTime<Utc>) -> Result<Listing> {
        let mut guard = self.listings.lock().await;
        let entry = guard.entry(listing.listing_id.clone()).or_insert_with(|| Listing {
            listing_id: listing.listing_id.clone(),
            title: listing.title.clone(),
            brand: listing.brand.clone(),
            manufacturer: listing.manufacturer.clone(),
            model: listing.model.clone(),
            category_path: serde_json::json!(listing.category_path),
            weight: listing.weight,
            dimensions: listing.dimensions.clone(),
            image_url: listing.image_url.clone(),
            flags: listing.flags.clone(),
            is_active: true,
            last_seen_at: seen_at,
            created_at: seen_at,
            updated_at: seen_at,
        });
        entry.title = listing.title.clone();
        entry.is_active = true;
        entry.last_seen_at = seen_at;
        entry.updated_at = seen_at;
        Ok(entry.clone())
    }

    async fn get_listing(&self, listing_id: &str) -> Result<Option<Listing>> {
        Ok(self.listings.lock().await.get(listing_id).cloned())
    }

    async fn list_active_listings(&self, pagination: PaginationOptions) -> Result<PaginationResult<Listing>> {
        let guard = self.listings.lock().await;
        let mut items: Vec<Listing> = guard.values().filter(|l| l.is_active).cloned().collect();
        items.sort_by(|a, b| a.listing_id.cmp(&b.listing_id));
        let total = items.len() as i64;
        let offset = ((pagination.page - 1).max(0) * pagination.limit) as usize;
        let page_items = items.into_iter().skip(offset).take(pagination.limit as usize).collect();
        Ok(PaginationResult::new(page_items, total, pagination))
    }

    async fn deactivate_stale(&self, now: DateTime<Utc>, deactivate_after: chrono::Duration) -> Result<u64> {
        let mut guard = self.listings.lock().await;
        let mut count = 0u64;
        for listing in guard.values_mut() {
            if listing.should_deactivate(now, deactivate_after) {
                listing.is_active = false;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let mut guard = self.snapshots.lock().await;
        let entry = guard.entry(snapshot.listing_id.clone()).or_default();
        if !entry.iter().any(|s| s.captured_at == snapshot.captured_at) {
            entry.push(snapshot.clone());
            entry.sort_by_key(|s| s.captured_at);
        }
        Ok(())
    }

    async fn latest_snapshot(&self, listing_id: &str) -> Result<Option<Snapshot>> {
        Ok(self.snapshots.lock().await.get(listing_id).and_then(|v| v.last().cloned()))
    }

    async fn last_two_snapshots(&self, listing_id: &str) -> Result<Vec<Snapshot>> {
        let guard = self.snapshots.lock().await;
        let mut tail: Vec<Snapshot> = guard.get(listing_id).map(|v| v.clone()).unwrap_or_default();
        tail.reverse();
        tail.truncate(2);
        Ok(tail)
    }

    async fn snapshot_history(&self, listing_id: &str, since: DateTime<Utc>) -> Result<Vec<Snapshot>> {
        Ok(self
            .snapshots
            .lock()
            .await
            .get(listing_id)
            .map(|v| v.iter().filter(|s| s.captured_at >= since).cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upsert(id: &str) -> UpsertListing {
        UpsertListing {
            listing_id: id.to_string(),
            title: "Widget".to_string(),
            brand: None,
            manufacturer: None,
            model: None,
            category_path: vec!["Home".to_string()],
            weight: None,
            dimensions: None,
            image_url: None,
            flags: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn test_upsert_then_get() {
        let store = InMemoryListingStore::new();
        let now = Utc::now();
        store.upsert_listing(&upsert("L1"), now).await.unwrap();
        let fetched = store.get_listing("L1").await.unwrap().unwrap();
        assert_eq!(fetched.listing_id, "L1");
        assert!(fetched.is_active);
    }

    #[tokio::test]
    async fn test_deactivate_stale() {
        let store = InMemoryListingStore::new();
        let old = Utc::now() - chrono::Duration::days(30);
        store.upsert_listing(&upsert("L1"), old).await.unwrap();
        let deactivated = store
            .deactivate_stale(Utc::now(), chrono::Duration::days(14))
            .await
            .unwrap();
        assert_eq!(deactivated, 1);
        assert!(!store.get_listing("L1").await.unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn test_snapshot_insert_is_idempotent_per_timestamp() {
        let store = InMemoryListingStore::new();
        let ts = Utc::now();
        let snapshot = Snapshot {
            listing_id: "L1".to_string(),
            captured_at: ts,
            current_price: "10.00".parse().unwrap(),
            list_price: None,
            lowest_new: None,
            lowest_used: None,
            currency: "USD".to_string(),
            bsr: None,
            bsr_category: None,
            stock_status: crate::snapshot::StockStatus::InStock,
            fulfillment_type: crate::snapshot::FulfillmentType::Platform,
            seller_count: 1,
            rating_average: None,
            review_count: 0,
            rating_histogram: None,
            ingestion_session_id: "s1".to_string(),
        };
        store.insert_snapshot(&snapshot).await.unwrap();
        store.insert_snapshot(&snapshot).await.unwrap();
        assert_eq!(store.snapshot_history("L1", ts - chrono::Duration::days(1)).await.unwrap().len(), 1);
    }
}
