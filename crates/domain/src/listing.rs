//! Listing entity (§3). A marketplace product identified by an opaque
//! listing-id. Created on first sighting, updated at each ingestion,
//! soft-deactivated when absent from discovery for a configurable interval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Listing {
    pub listing_id: String,
    pub title: String,
    pub brand: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    /// Ordered sequence of category names, root first, stored as JSON.
    pub category_path: serde_json::Value,
    pub weight: Option<f64>,
    pub dimensions: Option<serde_json::Value>,
    pub image_url: Option<String>,
    pub flags: serde_json::Value,
    pub is_active: bool,
    pub last_seen_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    /// Category path as an ordered vec of names, root first.
    pub fn category_path_vec(&self) -> Vec<String> {
        self.category_path
            .as_array()
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }

    /// A listing is stale for freshness filtering if its last sighting
    /// predates `now - threshold`.
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: chrono::Duration) -> bool {
        now - self.last_seen_at > threshold
    }

    /// Soft-deactivation check (§3 Listing lifecycle): absent from
    /// discovery for longer than `deactivate_after`.
    pub fn should_deactivate(&self, now: DateTime<Utc>, deactivate_after: chrono::Duration) -> bool {
        self.is_active && now - self.last_seen_at > deactivate_after
    }
}

/// New-listing payload used by the ingestion upsert step.
#[derive(Debug, Clone)]
pub struct UpsertListing {
    pub listing_id: String,
    pub title: String,
    pub brand: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub category_path: Vec<String>,
    pub weight: Option<f64>,
    pub dimensions: Option<serde_json::Value>,
    pub image_url: Option<String>,
    pub flags: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_listing() -> Listing {
        Listing {
            listing_id: "B0TEST1234".to_string(),
            title: "Test widget".to_string(),
            brand: None,
            manufacturer: None,
            model: None,
            category_path: serde_json::json!(["Home", "Kitchen"]),
            weight: None,
            dimensions: None,
            image_url: None,
            flags: serde_json::json!({}),
            is_active: true,
            last_seen_at: Utc::now(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_category_path_vec() {
        let listing = base_listing();
        assert_eq!(listing.category_path_vec(), vec!["Home", "Kitchen"]);
    }

    #[test]
    fn test_is_stale() {
        let mut listing = base_listing();
        listing.last_seen_at = Utc::now() - chrono::Duration::hours(30);
        assert!(listing.is_stale(Utc::now(), chrono::Duration::hours(24)));
        assert!(!listing.is_stale(Utc::now(), chrono::Duration::hours(48)));
    }

    #[test]
    fn test_should_deactivate_requires_active() {
        let mut listing = base_listing();
        listing.last_seen_at = Utc::now() - chrono::Duration::hours(400);
        listing.is_active = false;
        assert!(!listing.should_deactivate(Utc::now(), chrono::Duration::hours(336)));
        listing.is_active = true;
        assert!(listing.should_deactivate(Utc::now(), chrono::Duration::hours(336)));
    }
}
