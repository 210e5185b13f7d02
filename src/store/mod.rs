// =============================================================================
// Price Store — persistence seam for observations and analytics snapshots
// =============================================================================
//
// The engine never reaches for a global connection: a store handle is built
// once at startup and passed (as `Arc<dyn PriceStore>`) to the ingestion
// cycle, the analytics refresher and the HTTP layer.
//
// Every operation is individually atomic. There is no cross-item transaction;
// snapshots are keyed by item and written with last-writer-wins semantics.
// =============================================================================

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{AnalyticsSnapshot, ItemId, Price, PricePoint};

pub use memory::InMemoryPriceStore;
pub use sqlite::SqlitePriceStore;

/// Failure reading from or writing to the price store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt row for item {item_id}: {reason}")]
    Corrupt { item_id: ItemId, reason: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage contract consumed by ingestion and the analytics pipeline.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Record an observation stamped at `timestamp`.
    async fn append_price_at(
        &self,
        item_id: ItemId,
        timestamp: DateTime<Utc>,
        buy_price: Price,
        sell_price: Price,
    ) -> StoreResult<()>;

    /// Record an observation stamped with the current time.
    async fn append_price(&self, item_id: ItemId, buy_price: Price, sell_price: Price) -> StoreResult<()> {
        self.append_price_at(item_id, Utc::now(), buy_price, sell_price)
            .await
    }

    /// Full history for an item, oldest first (ties in insertion order).
    async fn query_ascending(&self, item_id: ItemId) -> StoreResult<Vec<PricePoint>>;

    /// Up to `limit` most recent observations, newest first.
    async fn query_recent_descending(&self, item_id: ItemId, limit: usize) -> StoreResult<Vec<PricePoint>>;

    /// Insert or replace the snapshot keyed by `snapshot.item_id`.
    async fn upsert_snapshot(&self, snapshot: &AnalyticsSnapshot) -> StoreResult<()>;

    /// Current snapshot for an item, if one has been written.
    async fn get_snapshot(&self, item_id: ItemId) -> StoreResult<Option<AnalyticsSnapshot>>;

    /// All current snapshots, ordered by item id.
    async fn list_snapshots(&self) -> StoreResult<Vec<AnalyticsSnapshot>>;
}
