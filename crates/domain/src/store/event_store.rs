//! Raw-event and economic-event persistence. Raw-event inserts are
//! idempotent under `(listing_id, detected_at)` collision via
//! `ON CONFLICT DO NOTHING` — the store is the source of truth for that
//! invariant, not application-level dedup (§5).

use crate::economic_event::EconomicEvent;
use crate::error::Result;
use crate::events::{BsrEvent, PriceEvent, StockEvent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use smartacus_core::DatabasePool;

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert_price_event(&self, event: &PriceEvent) -> Result<bool>;
    async fn insert_bsr_event(&self, event: &BsrEvent) -> Result<bool>;
    async fn insert_stock_event(&self, event: &StockEvent) -> Result<bool>;
    async fn events_since(&self, listing_id: &str, since: DateTime<Utc>) -> Result<EventCounts>;
}

/// Per-kind counts over a window, consumed by the aggregation step feeding
/// `AggregatedMetrics.event_counts_by_kind`.
#[derive(Debug, Clone, Default)]
pub struct EventCounts {
    pub price_events: i64,
    pub bsr_events: i64,
    pub stock_events: i64,
}

#[async_trait]
pub trait EconomicEventStore: Send + Sync {
    /// Returns `false` when the row already existed (idempotent insert).
    async fn insert_economic_event(&self, event: &EconomicEvent) -> Result<bool>;
    async fn actionable_events_since(&self, since: DateTime<Utc>) -> Result<Vec<EconomicEvent>>;
}

pub struct PostgresEventStore {
    db: DatabasePool,
}

impl PostgresEventStore {
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }

    fn pool(&self) -> &sqlx::PgPool {
        self.db.handle()
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn insert_price_event(&self, event: &PriceEvent) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO price_events (
                listing_id, detected_at, before_value, after_value, pct_change,
                direction, severity, before_snapshot_at, after_snapshot_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (listing_id, detected_at) DO NOTHING
            "#,
        )
        .bind(&event.listing_id)
        .bind(event.detected_at)
        .bind(event.before_value)
        .bind(event.after_value)
        .bind(event.pct_change)
        .bind(event.direction)
        .bind(event.severity)
        .bind(event.before_snapshot_at)
        .bind(event.after_snapshot_at)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_bsr_event(&self, event: &BsrEvent) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO bsr_events (
                listing_id, detected_at, before_value, after_value, pct_change,
                direction, severity, before_snapshot_at, after_snapshot_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (listing_id, detected_at) DO NOTHING
            "#,
        )
        .bind(&event.listing_id)
        .bind(event.detected_at)
        .bind(event.before_value)
        .bind(event.after_value)
        .bind(event.pct_change)
        .bind(event.direction)
        .bind(event.severity)
        .bind(event.before_snapshot_at)
        .bind(event.after_snapshot_at)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_stock_event(&self, event: &StockEvent) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO stock_events (listing_id, detected_at, kind, severity, before_snapshot_at, after_snapshot_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (listing_id, detected_at) DO NOTHING
            "#,
        )
        .bind(&event.listing_id)
        .bind(event.detected_at)
        .bind(event.kind)
        .bind(event.severity)
        .bind(event.before_snapshot_at)
        .bind(event.after_snapshot_at)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn events_since(&self, listing_id: &str, since: DateTime<Utc>) -> Result<EventCounts> {
        let price_events: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM price_events WHERE listing_id = $1 AND detected_at >= $2")
                .bind(listing_id)
                .bind(since)
                .fetch_one(self.pool())
                .await?;
        let bsr_events: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM bsr_events WHERE listing_id = $1 AND detected_at >= $2")
                .bind(listing_id)
                .bind(since)
                .fetch_one(self.pool())
                .await?;
        let stock_events: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stock_events WHERE listing_id = $1 AND detected_at >= $2")
                .bind(listing_id)
                .bind(since)
                .fetch_one(self.pool())
                .await?;
        Ok(EventCounts { price_events, bsr_events, stock_events })
    }
}

pub struct PostgresEconomicEventStore {
    db: DatabasePool,
}

impl PostgresEconomicEventStore {
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }

    fn pool(&self) -> &sqlx::PgPool {
        self.db.handle()
    }
}

#[async_trait]
impl EconomicEventStore for PostgresEconomicEventStore {
    async fn insert_economic_event(&self, event: &EconomicEvent) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO economic_events (
                listing_id, detected_at, event_type, thesis, confidence, urgency,
                estimated_window_days, supporting_signals, contradicting_signals, opportunity_value
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (listing_id, detected_at) DO NOTHING
            "#,
        )
        .bind(&event.listing_id)
        .bind(event.detected_at)
        .bind(event.event_type)
        .bind(&event.thesis)
        .bind(event.confidence)
        .bind(event.urgency)
        .bind(event.estimated_window_days)
        .bind(&event.supporting_signals)
        .bind(&event.contradicting_signals)
        .bind(event.opportunity_value)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn actionable_events_since(&self, since: DateTime<Utc>) -> Result<Vec<EconomicEvent>> {
        let events = sqlx::query_as::<_, EconomicEvent>(
            "SELECT * FROM economic_events WHERE detected_at >= $1 ORDER BY detected_at DESC",
        )
        .bind(since)
        .fetch_all(self.pool())
        .await?;
        Ok(events.into_iter().filter(|e| e.is_actionable()).collect())
    }
}

/// In-memory fake shared by the two traits above, keyed for simple
/// idempotency checks without a real unique index.
#[derive(Default)]
pub struct InMemoryEventStore {
    price_events: tokio::sync::Mutex<Vec<PriceEvent>>,
    bsr_events: tokio::sync::Mutex<Vec<BsrEvent>>,
    stock_events: tokio::sync::Mutex<Vec<StockEvent>>,
    economic_events: tokio::sync::Mutex<Vec<EconomicEvent>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn insert_price_event(&self, event: &PriceEvent) -> Result<bool> {
        let mut guard = self.price_events.lock().await;
        if guard.iter().any(|e| e.listing_id == event.listing_id && e.detected_at == event.detected_at) {
            return Ok(false);
        }
        guard.push(event.clone());
        Ok(true)
    }

    async fn insert_bsr_event(&self, event: &BsrEvent) -> Result<bool> {
        let mut guard = self.bsr_events.lock().await;
        if guard.iter().any(|e| e.listing_id == event.listing_id && e.detected_at == event.detected_at) {
            return Ok(false);
        }
        guard.push(event.clone());
        Ok(true)
    }

    async fn insert_stock_event(&self, event: &StockEvent) -> Result<bool> {
        let mut guard = self.stock_events.lock().await;
        if guard.iter().any(|e| e.listing_id == event.listing_id && e.detected_at == event.detected_at) {
            return Ok(false);
        }
        guard.push(event.clone());
        Ok(true)
    }

    async fn events_since(&self, listing_id: &str, since: DateTime<Utc>) -> Result<EventCounts> {
        let price_events = self
            .price_events
            .lock()
            .await
            .iter()
            .filter(|e| e.listing_id == listing_id && e.detected_at >= since)
            .count() as i64;
        let bsr_events = self
            .bsr_events
            .lock()
            .await
            .iter()
            .filter(|e| e.listing_id == listing_id && e.detected_at >= since)
            .count() as i64;
        let stock_events = self
            .stock_events
            .lock()
            .await
            .iter()
            .filter(|e| e.listing_id == listing_id && e.detected_at >= since)
            .count() as i64;
        Ok(EventCounts { price_events, bsr_events, stock_events })
    }
}

#[async_trait]
impl EconomicEventStore for InMemoryEventStore {
    async fn insert_economic_event(&self, event: &EconomicEvent) -> Result<bool> {
        let mut guard = self.economic_events.lock().await;
        if guard.iter().any(|e| e.listing_id == event.listing_id && e.detected_at == event.detected_at) {
            return Ok(false);
        }
        guard.push(event.clone());
        Ok(true)
    }

    async fn actionable_events_since(&self, since: DateTime<Utc>) -> Result<Vec<EconomicEvent>> {
        Ok(self
            .economic_events
            .lock()
            .await
            .iter()
            .filter(|e| e.detected_at >= since && e.is_actionable())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economic_event::{Confidence, EconomicEventType, Urgency};
    use crate::events::{PriceDirection, Severity};

    #[tokio::test]
    async fn test_price_event_insert_is_idempotent() {
        let store = InMemoryEventStore::new();
        let now = Utc::now();
        let event = PriceEvent {
            listing_id: "L1".to_string(),
            detected_at: now,
            before_value: "10.00".parse().unwrap(),
            after_value: "8.00".parse().unwrap(),
            pct_change: -20.0,
            direction: PriceDirection::Down,
            severity: Severity::High,
            before_snapshot_at: now - chrono::Duration::hours(6),
            after_snapshot_at: now,
        };
        assert!(store.insert_price_event(&event).await.unwrap());
        assert!(!store.insert_price_event(&event).await.unwrap());
    }

    #[tokio::test]
    async fn test_actionable_filter_excludes_weak_events() {
        let store = InMemoryEventStore::new();
        let now = Utc::now();
        let weak = EconomicEvent {
            listing_id: "L1".to_string(),
            detected_at: now,
            event_type: EconomicEventType::SupplyShock,
            thesis: "t".to_string(),
            confidence: Confidence::Weak,
            urgency: Urgency::Low,
            estimated_window_days: 30,
            supporting_signals: serde_json::json!(["a", "b", "c"]),
            contradicting_signals: serde_json::json!([]),
            opportunity_value: None,
        };
        store.insert_economic_event(&weak).await.unwrap();
        let actionable = store.actionable_events_since(now - chrono::Duration::hours(1)).await.unwrap();
        assert!(actionable.is_empty());
    }
}
