//! Remote review provider (§6): an async-job model — submit a fetch
//! request, poll until terminal. Client-side star filtering is mandatory
//! because upstream filter-by-star is known-unreliable: always pull
//! `max(50, 4*required)` rows sorted by recency and partition locally.

use crate::error::{Result, ReviewsError};
use async_trait::async_trait;
use smartacus_domain::RawReview;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarFilter {
    Negative,
    Positive,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Recency,
    Helpfulness,
}

pub struct SubmitRequest<'a> {
    pub listing_id: &'a str,
    pub marketplace_domain: &'a str,
    pub limit: usize,
    pub star_filter: Option<StarFilter>,
    pub sort: SortOrder,
}

#[async_trait]
pub trait ReviewProvider: Send + Sync {
    async fn submit(&self, request: SubmitRequest<'_>) -> Result<String>;
    async fn poll(&self, job_id: &str) -> Result<(JobStatus, Vec<RawReview>)>;
}

/// Fetches reviews for one listing, applying the mandatory client-side
/// filter partition (§6) and the configured wait/poll budget.
pub async fn fetch_reviews(
    provider: &dyn ReviewProvider,
    listing_id: &str,
    marketplace_domain: &str,
    required: usize,
    max_cap: usize,
    max_wait: Duration,
) -> Result<Vec<RawReview>> {
    let fetch_limit = (4 * required).max(50).min(max_cap);
    let job_id = provider
        .submit(SubmitRequest { listing_id, marketplace_domain, limit: fetch_limit, star_filter: None, sort: SortOrder::Recency })
        .await?;

    let deadline = tokio::time::Instant::now() + max_wait;
    let raw = loop {
        let (status, rows) = provider.poll(&job_id).await?;
        match status {
            JobStatus::Success => break rows,
            JobStatus::Error => return Err(ReviewsError::Provider(format!("job {job_id} failed"))),
            JobStatus::Pending => {
                if tokio::time::Instant::now() >= deadline {
                    return Err(ReviewsError::JobTimeout(job_id, max_wait.as_secs()));
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        }
    };

    Ok(partition_by_rating(raw, required, max_cap))
}

/// Client-side partition: dedup by review-id, then take up to `required`
/// negatives (rating <= 3) and fill the rest with positives, capped
/// overall at `max_cap` (§6, S6).
fn partition_by_rating(rows: Vec<RawReview>, required: usize, max_cap: usize) -> Vec<RawReview> {
    let mut seen = std::collections::HashSet::new();
    let mut deduped = Vec::new();
    for row in rows {
        if seen.insert(row.review_id.clone()) {
            deduped.push(row);
        }
    }

    let (negatives, positives): (Vec<RawReview>, Vec<RawReview>) = deduped.into_iter().partition(|r| r.is_negative());
    let negative_count = negatives.len().min(required);
    let mut out: Vec<RawReview> = negatives.into_iter().take(negative_count).collect();
    let remaining = max_cap.saturating_sub(out.len());
    out.extend(positives.into_iter().take(remaining));
    out.truncate(max_cap);
    out
}

/// In-memory provider fake for tests: jobs resolve immediately with a
/// pre-seeded review set.
#[derive(Default)]
pub struct MockReviewProvider {
    seeded: Mutex<HashMap<String, Vec<RawReview>>>,
}

impl MockReviewProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, listing_id: &str, reviews: Vec<RawReview>) {
        self.seeded.lock().unwrap().insert(listing_id.to_string(), reviews);
    }
}

#[async_trait]
impl ReviewProvider for MockReviewProvider {
    async fn submit(&self, request: SubmitRequest<'_>) -> Result<String> {
        Ok(format!("{}:{}", request.listing_id, Uuid::new_v4()))
    }

    async fn poll(&self, job_id: &str) -> Result<(JobStatus, Vec<RawReview>)> {
        let listing_id = job_id.split(':').next().unwrap_or_default();
        let guard = self.seeded.lock().unwrap();
        Ok((JobStatus::Success, guard.get(listing_id).cloned().unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn review(id: &str, rating: i32) -> RawReview {
        RawReview { review_id: id.to_string(), body: "body".to_string(), rating, title: None, date: Utc::now(), helpful_votes: 0 }
    }

    #[test]
    fn test_partition_fills_from_positives_when_negatives_scarce() {
        let rows: Vec<RawReview> = (0..40)
            .map(|i| if i < 8 { review(&format!("n{i}"), 2) } else { review(&format!("p{i}"), 5) })
            .collect();
        let result = partition_by_rating(rows, 10, 500);
        let negatives = result.iter().filter(|r| r.is_negative()).count();
        assert_eq!(negatives, 8);
        assert_eq!(result.len(), 40);
    }

    #[test]
    fn test_partition_dedupes_by_review_id() {
        let rows = vec![review("a", 5), review("a", 5), review("b", 2)];
        let result = partition_by_rating(rows, 5, 100);
        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_reviews_from_mock() {
        let provider = MockReviewProvider::new();
        provider.seed("L1", vec![review("a", 2), review("b", 5)]);
        let result = fetch_reviews(&provider, "L1", "amazon.com", 10, 500, Duration::from_secs(5)).await.unwrap();
        assert_eq!(result.len(), 2);
    }
}
