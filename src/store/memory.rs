// =============================================================================
// In-memory PriceStore
// =============================================================================
//
// Thread-safe store backed by `parking_lot::RwLock` maps. Data is lost on
// restart; used for tests and for running without a database file.
// =============================================================================

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{PriceStore, StoreResult};
use crate::types::{AnalyticsSnapshot, ItemId, Price, PricePoint};

#[derive(Default)]
pub struct InMemoryPriceStore {
    /// Per-item history, kept sorted by timestamp (stable for ties).
    prices: RwLock<HashMap<ItemId, Vec<PricePoint>>>,
    snapshots: RwLock<BTreeMap<ItemId, AnalyticsSnapshot>>,
}

impl InMemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of observations recorded for `item_id`.
    pub fn count(&self, item_id: ItemId) -> usize {
        self.prices.read().get(&item_id).map_or(0, Vec::len)
    }
}

#[async_trait]
impl PriceStore for InMemoryPriceStore {
    async fn append_price_at(
        &self,
        item_id: ItemId,
        timestamp: DateTime<Utc>,
        buy_price: Price,
        sell_price: Price,
    ) -> StoreResult<()> {
        let point = PricePoint {
            item_id,
            timestamp,
            buy_price,
            sell_price,
        };
        let mut map = self.prices.write();
        let history = map.entry(item_id).or_default();
        // Insert after every point with the same or an earlier timestamp.
        let at = history.partition_point(|p| p.timestamp <= timestamp);
        history.insert(at, point);
        Ok(())
    }

    async fn query_ascending(&self, item_id: ItemId) -> StoreResult<Vec<PricePoint>> {
        Ok(self.prices.read().get(&item_id).cloned().unwrap_or_default())
    }

    async fn query_recent_descending(&self, item_id: ItemId, limit: usize) -> StoreResult<Vec<PricePoint>> {
        let map = self.prices.read();
        Ok(map
            .get(&item_id)
            .map(|h| h.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn upsert_snapshot(&self, snapshot: &AnalyticsSnapshot) -> StoreResult<()> {
        self.snapshots
            .write()
            .insert(snapshot.item_id, snapshot.clone());
        Ok(())
    }

    async fn get_snapshot(&self, item_id: ItemId) -> StoreResult<Option<AnalyticsSnapshot>> {
        Ok(self.snapshots.read().get(&item_id).cloned())
    }

    async fn list_snapshots(&self) -> StoreResult<Vec<AnalyticsSnapshot>> {
        Ok(self.snapshots.read().values().cloned().collect())
    }
}
