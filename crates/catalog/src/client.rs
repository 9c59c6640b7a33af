//! Remote catalog client (§4.1, §6). A single production implementation
//! backed by `reqwest`, rate-limited through a shared [`TokenBucket`], and a
//! hand-written in-memory fixture for use by `pipeline`/`strategy` tests —
//! no mocking framework, matching the rest of this codebase.

use crate::error::{CatalogError, Result};
use crate::rate_limiter::{estimate_fetch_cost, TokenBucket};
use crate::transform::{cents_to_decimal, minutes_to_utc, parse_history_points, pick_current_price, rating_from_tenths};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use smartacus_domain::{FulfillmentType, HistoryPoint, Snapshot, StockStatus, UpsertListing};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{info, warn};
use uuid::Uuid;

const MAX_BATCH_SIZE: usize = 100;

/// One listing's ingested state, bundling the catalog row and its fresh
/// snapshot (§3 Listing / Snapshot, produced together by one fetch).
#[derive(Debug, Clone)]
pub struct FetchedProduct {
    pub listing: UpsertListing,
    pub snapshot: Snapshot,
    pub price_history: Vec<HistoryPoint>,
    pub bsr_history: Vec<HistoryPoint>,
}

#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetches full product data for up to `listing_ids.len()` listings,
    /// batching client-side at 100 ids/request and concatenating results in
    /// input order (§4.1).
    async fn fetch_products(
        &self,
        listing_ids: &[String],
        include_history: bool,
        include_offers: bool,
    ) -> Result<Vec<FetchedProduct>>;

    /// Discovers listing ids for a category (used by ingestion's discovery
    /// step).
    async fn category_listings(&self, category_id: &str, page: u32) -> Result<Vec<String>>;

    /// Best-sellers listing for a category, ordered best-rank first.
    async fn best_sellers(&self, category_id: &str) -> Result<Vec<String>>;

    async fn search(&self, query: &str, page: u32) -> Result<Vec<String>>;

    async fn tokens_remaining(&self) -> f64;

    async fn health(&self) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct RawProduct {
    asin: String,
    title: String,
    brand: Option<String>,
    manufacturer: Option<String>,
    model: Option<String>,
    #[serde(default)]
    category_tree: Vec<String>,
    #[serde(rename = "itemWeight")]
    item_weight: Option<f64>,
    #[serde(rename = "imagesCSV")]
    images_csv: Option<String>,
    #[serde(rename = "buyBoxPriceNew")]
    buy_box_price_new: Option<i64>,
    #[serde(rename = "primaryPrice")]
    primary_price: Option<i64>,
    #[serde(rename = "newPrice")]
    new_price: Option<i64>,
    #[serde(rename = "listPrice")]
    list_price: Option<i64>,
    #[serde(rename = "lowestNew")]
    lowest_new: Option<i64>,
    #[serde(rename = "lowestUsed")]
    lowest_used: Option<i64>,
    currency: Option<String>,
    #[serde(rename = "salesRank")]
    sales_rank: Option<i64>,
    #[serde(rename = "salesRankCategory")]
    sales_rank_category: Option<String>,
    #[serde(rename = "stockStatus")]
    stock_status: Option<String>,
    #[serde(rename = "fulfillmentType")]
    fulfillment_type: Option<String>,
    #[serde(rename = "sellerCount")]
    seller_count: Option<i32>,
    #[serde(rename = "ratingTenths")]
    rating_tenths: Option<i64>,
    #[serde(rename = "reviewCount")]
    review_count: Option<i32>,
    #[serde(rename = "priceHistory", default)]
    price_history: Vec<i64>,
    #[serde(rename = "bsrHistory", default)]
    bsr_history: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct FetchResponse {
    products: Vec<RawProduct>,
    #[serde(rename = "tokensLeft")]
    tokens_left: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ListingIdsResponse {
    #[serde(default)]
    asins: Vec<String>,
    #[serde(rename = "tokensLeft")]
    tokens_left: Option<f64>,
}

fn parse_stock_status(raw: Option<&str>) -> StockStatus {
    match raw {
        Some("in_stock") => StockStatus::InStock,
        Some("low_stock") => StockStatus::LowStock,
        Some("out_of_stock") => StockStatus::OutOfStock,
        Some("back_ordered") => StockStatus::BackOrdered,
        _ => StockStatus::Unknown,
    }
}

fn parse_fulfillment_type(raw: Option<&str>) -> FulfillmentType {
    match raw {
        Some("platform") => FulfillmentType::Platform,
        Some("platform_fulfilled") => FulfillmentType::PlatformFulfilled,
        Some("merchant_fulfilled") => FulfillmentType::MerchantFulfilled,
        _ => FulfillmentType::Unknown,
    }
}

fn raw_to_fetched(raw: RawProduct, ingestion_session_id: &str) -> Result<FetchedProduct> {
    let current_cents = pick_current_price(raw.buy_box_price_new, raw.primary_price, raw.new_price)
        .ok_or_else(|| CatalogError::Transform(format!("{}: no usable current price", raw.asin)))?;
    let current_price = cents_to_decimal(current_cents)
        .ok_or_else(|| CatalogError::Transform(format!("{}: negative current price", raw.asin)))?;

    let listing = UpsertListing {
        listing_id: raw.asin.clone(),
        title: raw.title,
        brand: raw.brand,
        manufacturer: raw.manufacturer,
        model: raw.model,
        category_path: raw.category_tree,
        weight: raw.item_weight,
        dimensions: None,
        image_url: raw.images_csv.and_then(|csv| csv.split(',').next().map(str::to_string)),
        flags: serde_json::json!({}),
    };

    let snapshot = Snapshot {
        listing_id: raw.asin,
        captured_at: chrono::Utc::now(),
        current_price,
        list_price: raw.list_price.and_then(cents_to_decimal),
        lowest_new: raw.lowest_new.and_then(cents_to_decimal),
        lowest_used: raw.lowest_used.and_then(cents_to_decimal),
        currency: raw.currency.unwrap_or_else(|| "USD".to_string()),
        bsr: raw.sales_rank.filter(|&r| r > 0),
        bsr_category: raw.sales_rank_category,
        stock_status: parse_stock_status(raw.stock_status.as_deref()),
        fulfillment_type: parse_fulfillment_type(raw.fulfillment_type.as_deref()),
        seller_count: raw.seller_count.unwrap_or(0),
        rating_average: raw.rating_tenths.and_then(rating_from_tenths),
        review_count: raw.review_count.unwrap_or(0),
        rating_histogram: None,
        ingestion_session_id: ingestion_session_id.to_string(),
    };

    Ok(FetchedProduct {
        listing,
        snapshot,
        price_history: parse_history_points(&raw.price_history),
        bsr_history: parse_history_points(&raw.bsr_history),
    })
}

pub struct ReqwestCatalogClient {
    http: Client,
    base_url: String,
    bucket: TokenBucket,
    max_retries: u32,
    max_retry_delay: Duration,
    request_count: AtomicUsize,
}

impl ReqwestCatalogClient {
    pub fn new(api_key: &str, base_url: &str, tokens_per_minute: u32, max_retries: u32, timeout_s: u64, max_retry_delay_s: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_s))
            .build()?;
        Ok(Self {
            http,
            base_url: format!("{base_url}?key={api_key}"),
            bucket: TokenBucket::new(tokens_per_minute),
            max_retries,
            max_retry_delay: Duration::from_secs(max_retry_delay_s),
            request_count: AtomicUsize::new(0),
        })
    }

    /// Three-class retry policy (§4.1): auth failures are terminal,
    /// rate-limit/throttle responses back off and retry, transport errors
    /// back off and retry up to `max_retries`.
    async fn send_with_retry<T: for<'de> Deserialize<'de>>(&self, url: String) -> Result<T> {
        let mut attempt = 0;
        loop {
            let resp = self.http.get(&url).send().await;
            match resp {
                Ok(r) if r.status() == StatusCode::UNAUTHORIZED || r.status() == StatusCode::FORBIDDEN => {
                    return Err(CatalogError::InvalidAuth);
                }
                Ok(r) if r.status() == StatusCode::TOO_MANY_REQUESTS => {
                    if attempt >= self.max_retries {
                        return Err(CatalogError::RateLimit);
                    }
                    let delay = backoff_delay(attempt, self.max_retry_delay);
                    warn!(attempt, delay_ms = delay.as_millis() as u64, "rate-limited, backing off");
                    sleep(delay).await;
                    attempt += 1;
                }
                Ok(r) if r.status().is_success() => {
                    return r.json::<T>().await.map_err(CatalogError::from);
                }
                Ok(r) => {
                    let status = r.status();
                    if attempt >= self.max_retries {
                        return Err(CatalogError::Fetch(format!("http {status} after {attempt} retries")));
                    }
                    let delay = backoff_delay(attempt, self.max_retry_delay);
                    warn!(attempt, %status, "transient http error, backing off");
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(CatalogError::Fetch(format!("transport error after {attempt} retries: {e}")));
                    }
                    let delay = backoff_delay(attempt, self.max_retry_delay);
                    warn!(attempt, error = %e, "transport error, backing off");
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn next_session_id(&self) -> String {
        let n = self.request_count.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", Uuid::new_v4(), n)
    }
}

fn backoff_delay(attempt: u32, cap: Duration) -> Duration {
    let secs = 2u64.saturating_pow(attempt).min(cap.as_secs().max(1));
    Duration::from_secs(secs)
}

#[async_trait]
impl CatalogClient for ReqwestCatalogClient {
    async fn fetch_products(&self, listing_ids: &[String], include_history: bool, include_offers: bool) -> Result<Vec<FetchedProduct>> {
        let session_id = self.next_session_id();
        let mut out = Vec::with_capacity(listing_ids.len());
        for chunk in listing_ids.chunks(MAX_BATCH_SIZE) {
            let cost = estimate_fetch_cost(chunk.len(), include_history, include_offers);
            self.bucket.reserve(cost).await;
            let url = format!(
                "{}&asins={}&history={}&offers={}",
                self.base_url,
                chunk.join(","),
                include_history as u8,
                include_offers as u8,
            );
            let resp: FetchResponse = self.send_with_retry(url).await?;
            if let Some(remaining) = resp.tokens_left {
                self.bucket.reconcile(remaining).await;
            }
            for raw in resp.products {
                out.push(raw_to_fetched(raw, &session_id)?);
            }
        }
        info!(fetched = out.len(), requested = listing_ids.len(), "fetched products");
        Ok(out)
    }

    async fn category_listings(&self, category_id: &str, page: u32) -> Result<Vec<String>> {
        self.bucket.reserve(1.0).await;
        let url = format!("{}&category={}&page={}", self.base_url, category_id, page);
        let resp: ListingIdsResponse = self.send_with_retry(url).await?;
        if let Some(remaining) = resp.tokens_left {
            self.bucket.reconcile(remaining).await;
        }
        Ok(resp.asins)
    }

    async fn best_sellers(&self, category_id: &str) -> Result<Vec<String>> {
        self.bucket.reserve(1.0).await;
        let url = format!("{}&bestsellers={}", self.base_url, category_id);
        let resp: ListingIdsResponse = self.send_with_retry(url).await?;
        if let Some(remaining) = resp.tokens_left {
            self.bucket.reconcile(remaining).await;
        }
        Ok(resp.asins)
    }

    async fn search(&self, query: &str, page: u32) -> Result<Vec<String>> {
        self.bucket.reserve(1.0).await;
        let url = format!("{}&query={}&page={}", self.base_url, urlencoding_lite(query), page);
        let resp: ListingIdsResponse = self.send_with_retry(url).await?;
        if let Some(remaining) = resp.tokens_left {
            self.bucket.reconcile(remaining).await;
        }
        Ok(resp.asins)
    }

    async fn tokens_remaining(&self) -> f64 {
        self.bucket.tokens_remaining().await
    }

    async fn health(&self) -> Result<()> {
        self.bucket.reserve(0.0).await;
        Ok(())
    }
}

fn urlencoding_lite(s: &str) -> String {
    s.replace(' ', "+")
}

/// In-memory fixture for `pipeline`/`strategy` tests. Returns canned
/// [`FetchedProduct`]s keyed by listing id; unknown ids are simply omitted
/// from the result, matching how the real provider drops unrecognized asins.
pub struct MockCatalogClient {
    products: Mutex<std::collections::HashMap<String, FetchedProduct>>,
    category_pages: Mutex<std::collections::HashMap<String, Vec<String>>>,
    tokens: Mutex<f64>,
}

impl MockCatalogClient {
    pub fn new(tokens: f64) -> Self {
        Self {
            products: Mutex::new(std::collections::HashMap::new()),
            category_pages: Mutex::new(std::collections::HashMap::new()),
            tokens: Mutex::new(tokens),
        }
    }

    pub async fn seed_product(&self, product: FetchedProduct) {
        self.products.lock().await.insert(product.listing.listing_id.clone(), product);
    }

    pub async fn seed_category(&self, category_id: &str, listing_ids: Vec<String>) {
        self.category_pages.lock().await.insert(category_id.to_string(), listing_ids);
    }
}

#[async_trait]
impl CatalogClient for MockCatalogClient {
    async fn fetch_products(&self, listing_ids: &[String], _include_history: bool, _include_offers: bool) -> Result<Vec<FetchedProduct>> {
        let products = self.products.lock().await;
        Ok(listing_ids.iter().filter_map(|id| products.get(id).cloned()).collect())
    }

    async fn category_listings(&self, category_id: &str, _page: u32) -> Result<Vec<String>> {
        Ok(self.category_pages.lock().await.get(category_id).cloned().unwrap_or_default())
    }

    async fn best_sellers(&self, category_id: &str) -> Result<Vec<String>> {
        Ok(self.category_pages.lock().await.get(category_id).cloned().unwrap_or_default())
    }

    async fn search(&self, _query: &str, _page: u32) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn tokens_remaining(&self) -> f64 {
        *self.tokens.lock().await
    }

    async fn health(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(asin: &str) -> RawProduct {
        RawProduct {
            asin: asin.to_string(),
            title: "Widget".to_string(),
            brand: None,
            manufacturer: None,
            model: None,
            category_tree: vec!["Home".to_string()],
            item_weight: None,
            images_csv: None,
            buy_box_price_new: Some(1999),
            primary_price: None,
            new_price: None,
            list_price: None,
            lowest_new: None,
            lowest_used: None,
            currency: None,
            sales_rank: Some(1000),
            sales_rank_category: None,
            stock_status: Some("in_stock".to_string()),
            fulfillment_type: Some("platform".to_string()),
            seller_count: Some(3),
            rating_tenths: Some(42),
            review_count: Some(120),
            price_history: vec![0, 1999],
            bsr_history: vec![],
        }
    }

    #[test]
    fn test_raw_to_fetched_uses_buybox_price() {
        let fetched = raw_to_fetched(raw("B0TEST"), "sess-1").unwrap();
        assert_eq!(fetched.snapshot.current_price, Decimal::new(1999, 2));
        assert_eq!(fetched.snapshot.bsr, Some(1000));
        assert_eq!(fetched.price_history.len(), 1);
    }

    #[test]
    fn test_raw_to_fetched_rejects_missing_price() {
        let mut r = raw("B0TEST");
        r.buy_box_price_new = None;
        let result = raw_to_fetched(r, "sess-1");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_mock_client_filters_unknown_ids() {
        let mock = MockCatalogClient::new(500.0);
        mock.seed_product(raw_to_fetched(raw("B0TEST"), "sess-1").unwrap()).await;
        let result = mock.fetch_products(&["B0TEST".to_string(), "B0MISSING".to_string()], false, false).await.unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_backoff_delay_caps_at_max() {
        let cap = Duration::from_secs(30);
        assert!(backoff_delay(10, cap) <= cap);
    }
}
