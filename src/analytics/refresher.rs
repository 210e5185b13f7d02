// =============================================================================
// Analytics Refresher
// =============================================================================
//
// One refresh, for one item:
//   1. Load the 5 most recent observations -> SMA of buy and sell.
//   2. Load the full ascending history.
//   3. RSI-14 over buy prices once the history has more than 14 points.
//   4. MACD(12, 26, 9) over buy prices once it has more than 26 points.
//   5. Replace the item's snapshot.
//
// The snapshot is a pure function of the stored history, so refreshing twice
// without new observations writes identical values. Any store failure aborts
// only that item and surfaces as a `RefreshError`; batch refreshes keep going
// for the other items.
// =============================================================================

use std::sync::Arc;

use chrono::DateTime;
use futures_util::stream::{self, StreamExt};
use tracing::{debug, instrument, warn};

use super::RefreshError;
use crate::indicators::{
    calculate_macd, calculate_rsi, mean, FAST_PERIOD, RSI_PERIOD, SIGNAL_PERIOD, SLOW_PERIOD,
    SMA_WINDOW,
};
use crate::store::PriceStore;
use crate::types::{AnalyticsSnapshot, ItemId, PricePoint};

/// Outcome of refreshing a batch of items.
#[derive(Debug, Default)]
pub struct RefreshReport {
    /// Items whose snapshot was written, in ascending id order.
    pub refreshed: Vec<ItemId>,
    pub failed: Vec<RefreshError>,
}

/// Derive the snapshot for `item_id` from its recent observations (newest
/// first) and its full history (oldest first).
pub fn compute_snapshot(item_id: ItemId, recent: &[PricePoint], history: &[PricePoint]) -> AnalyticsSnapshot {
    let recent_buys: Vec<f64> = recent.iter().map(|p| p.buy_price as f64).collect();
    let recent_sells: Vec<f64> = recent.iter().map(|p| p.sell_price as f64).collect();

    let buys: Vec<f64> = history.iter().map(|p| p.buy_price as f64).collect();

    let rsi14 = if buys.len() > RSI_PERIOD {
        calculate_rsi(&buys, RSI_PERIOD).last().copied().unwrap_or(0.0)
    } else {
        0.0
    };

    let (macd_line, macd_signal, macd_hist) = if buys.len() > SLOW_PERIOD {
        calculate_macd(&buys, FAST_PERIOD, SLOW_PERIOD, SIGNAL_PERIOD)
            .last()
            .unwrap_or((0.0, 0.0, 0.0))
    } else {
        (0.0, 0.0, 0.0)
    };

    let last_updated = history
        .last()
        .or_else(|| recent.first())
        .map_or(DateTime::UNIX_EPOCH, |p| p.timestamp);

    AnalyticsSnapshot {
        item_id,
        sma5_buy: mean(&recent_buys),
        sma5_sell: mean(&recent_sells),
        rsi14,
        macd_line,
        macd_signal,
        macd_hist,
        last_updated,
    }
}

/// Keeps each item's analytics snapshot in step with its price history.
pub struct AnalyticsRefresher {
    store: Arc<dyn PriceStore>,
}

impl AnalyticsRefresher {
    pub fn new(store: Arc<dyn PriceStore>) -> Self {
        Self { store }
    }

    /// Recompute and replace the snapshot for one item.
    #[instrument(skip(self), name = "analytics::refresh")]
    pub async fn refresh(&self, item_id: ItemId) -> Result<AnalyticsSnapshot, RefreshError> {
        let fail = |source| RefreshError { item_id, source };

        let recent = self
            .store
            .query_recent_descending(item_id, SMA_WINDOW)
            .await
            .map_err(fail)?;
        let history = self.store.query_ascending(item_id).await.map_err(fail)?;

        let snapshot = compute_snapshot(item_id, &recent, &history);
        self.store.upsert_snapshot(&snapshot).await.map_err(fail)?;

        debug!(
            item_id,
            observations = history.len(),
            sma5_buy = snapshot.sma5_buy,
            sma5_sell = snapshot.sma5_sell,
            rsi14 = snapshot.rsi14,
            macd_hist = snapshot.macd_hist,
            "analytics refreshed"
        );
        Ok(snapshot)
    }

    /// Refresh every item in `items`, running up to `concurrency` refreshes
    /// at once. Failures are collected, never propagated.
    pub async fn refresh_many(&self, items: &[ItemId], concurrency: usize) -> RefreshReport {
        let results: Vec<(ItemId, Result<AnalyticsSnapshot, RefreshError>)> = stream::iter(items.iter().copied())
            .map(|item_id| async move { (item_id, self.refresh(item_id).await) })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        let mut report = RefreshReport::default();
        for (item_id, result) in results {
            match result {
                Ok(_) => report.refreshed.push(item_id),
                Err(e) => {
                    warn!(item_id, error = %e, "analytics refresh failed");
                    report.failed.push(e);
                }
            }
        }
        report.refreshed.sort_unstable();
        report.failed.sort_unstable_by_key(|e| e.item_id);
        report
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryPriceStore, StoreError, StoreResult};
    use crate::types::Price;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    const TRENDING: [Price; 30] = [
        10, 11, 9, 12, 15, 14, 16, 20, 18, 19, 21, 23, 22, 24, 26, 28, 27, 29, 31, 30, 32, 33, 35,
        34, 36, 38, 37, 39, 40, 42,
    ];

    async fn seed(store: &InMemoryPriceStore, item_id: ItemId, buys: &[Price]) {
        for (i, &buy) in buys.iter().enumerate() {
            let ts = Utc.timestamp_opt(1_700_000_000 + i as i64 * 600, 0).unwrap();
            store.append_price_at(item_id, ts, buy, buy + 2).await.unwrap();
        }
    }

    /// Store wrapper that fails history reads for one item.
    struct FlakyStore {
        inner: InMemoryPriceStore,
        broken_item: ItemId,
    }

    #[async_trait]
    impl PriceStore for FlakyStore {
        async fn append_price_at(
            &self,
            item_id: ItemId,
            timestamp: chrono::DateTime<Utc>,
            buy_price: Price,
            sell_price: Price,
        ) -> StoreResult<()> {
            self.inner
                .append_price_at(item_id, timestamp, buy_price, sell_price)
                .await
        }

        async fn query_ascending(&self, item_id: ItemId) -> StoreResult<Vec<PricePoint>> {
            if item_id == self.broken_item {
                return Err(StoreError::Unavailable("history read failed".into()));
            }
            self.inner.query_ascending(item_id).await
        }

        async fn query_recent_descending(&self, item_id: ItemId, limit: usize) -> StoreResult<Vec<PricePoint>> {
            self.inner.query_recent_descending(item_id, limit).await
        }

        async fn upsert_snapshot(&self, snapshot: &AnalyticsSnapshot) -> StoreResult<()> {
            self.inner.upsert_snapshot(snapshot).await
        }

        async fn get_snapshot(&self, item_id: ItemId) -> StoreResult<Option<AnalyticsSnapshot>> {
            self.inner.get_snapshot(item_id).await
        }

        async fn list_snapshots(&self) -> StoreResult<Vec<AnalyticsSnapshot>> {
            self.inner.list_snapshots().await
        }
    }

    #[tokio::test]
    async fn long_history_populates_all_indicators() {
        let store = Arc::new(InMemoryPriceStore::new());
        seed(&store, 1, &TRENDING).await;
        let refresher = AnalyticsRefresher::new(store.clone());

        let snap = refresher.refresh(1).await.unwrap();
        assert_ne!(snap.rsi14, 0.0);
        assert_ne!(snap.macd_line, 0.0);
        assert_ne!(snap.macd_signal, 0.0);
        assert_ne!(snap.macd_hist, 0.0);
        assert_eq!(snap.macd_hist, snap.macd_line - snap.macd_signal);

        // Last five buys: 38, 37, 39, 40, 42
        assert_eq!(snap.sma5_buy, 39.2);
        assert_eq!(snap.sma5_sell, 41.2);
        assert_eq!(store.get_snapshot(1).await.unwrap(), Some(snap));
    }

    #[tokio::test]
    async fn short_history_reports_zero_indicators() {
        let store = Arc::new(InMemoryPriceStore::new());
        seed(&store, 2, &TRENDING[..10]).await;
        let refresher = AnalyticsRefresher::new(store);

        let snap = refresher.refresh(2).await.unwrap();
        assert_eq!(snap.rsi14, 0.0);
        assert_eq!(snap.macd_line, 0.0);
        assert_eq!(snap.macd_signal, 0.0);
        assert_eq!(snap.macd_hist, 0.0);
        assert!(snap.sma5_buy > 0.0);
    }

    #[tokio::test]
    async fn rsi_without_macd_between_thresholds() {
        let store = Arc::new(InMemoryPriceStore::new());
        seed(&store, 3, &TRENDING[..20]).await;
        let snap = AnalyticsRefresher::new(store).refresh(3).await.unwrap();
        assert_ne!(snap.rsi14, 0.0);
        assert_eq!(snap.macd_line, 0.0);
    }

    #[tokio::test]
    async fn empty_history_writes_zero_snapshot() {
        let store = Arc::new(InMemoryPriceStore::new());
        let snap = AnalyticsRefresher::new(store.clone()).refresh(4).await.unwrap();
        assert_eq!(snap.sma5_buy, 0.0);
        assert_eq!(snap.sma5_sell, 0.0);
        assert_eq!(snap.last_updated, DateTime::UNIX_EPOCH);
        assert!(store.get_snapshot(4).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn refresh_is_idempotent() {
        let store = Arc::new(InMemoryPriceStore::new());
        seed(&store, 5, &TRENDING).await;
        let refresher = AnalyticsRefresher::new(store.clone());

        let first = refresher.refresh(5).await.unwrap();
        let second = refresher.refresh(5).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
        assert_eq!(store.list_snapshots().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn new_observation_overwrites_snapshot() {
        let store = Arc::new(InMemoryPriceStore::new());
        seed(&store, 6, &TRENDING).await;
        let refresher = AnalyticsRefresher::new(store.clone());
        let before = refresher.refresh(6).await.unwrap();

        let later = before.last_updated + chrono::Duration::minutes(10);
        store.append_price_at(6, later, 60, 70).await.unwrap();
        let after = refresher.refresh(6).await.unwrap();

        assert_eq!(after.last_updated, later);
        assert!(after.sma5_buy > before.sma5_buy);
        assert_eq!(store.list_snapshots().await.unwrap(), vec![after]);
    }

    #[tokio::test]
    async fn failure_is_isolated_to_one_item() {
        let inner = InMemoryPriceStore::new();
        seed(&inner, 10, &TRENDING).await;
        seed(&inner, 11, &TRENDING).await;
        seed(&inner, 12, &TRENDING[..8]).await;

        let store = Arc::new(FlakyStore {
            inner,
            broken_item: 11,
        });
        // Give the broken item a prior snapshot that must survive.
        let prior = compute_snapshot(11, &[], &[]);
        store.upsert_snapshot(&prior).await.unwrap();

        let refresher = AnalyticsRefresher::new(store.clone());
        let report = refresher.refresh_many(&[12, 11, 10], 4).await;

        assert_eq!(report.refreshed, vec![10, 12]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].item_id, 11);
        assert!(matches!(report.failed[0].source, StoreError::Unavailable(_)));
        assert_eq!(store.get_snapshot(11).await.unwrap(), Some(prior));
    }

    #[test]
    fn compute_snapshot_uses_newest_timestamp() {
        let history: Vec<PricePoint> = (0..3)
            .map(|i| PricePoint {
                item_id: 1,
                timestamp: Utc.timestamp_opt(100 + i, 0).unwrap(),
                buy_price: 10,
                sell_price: 12,
            })
            .collect();
        let recent: Vec<PricePoint> = history.iter().rev().cloned().collect();
        let snap = compute_snapshot(1, &recent, &history);
        assert_eq!(snap.last_updated, Utc.timestamp_opt(102, 0).unwrap());
        assert_eq!(snap.sma5_buy, 10.0);
        assert_eq!(snap.sma5_sell, 12.0);
    }
}
