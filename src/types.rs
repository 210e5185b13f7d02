// =============================================================================
// Shared types used across the flip engine
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Numeric identifier of a tradeable item.
pub type ItemId = u32;

/// Whole-coin price as reported by the exchange.
pub type Price = i64;

/// One recorded price observation for an item. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub item_id: ItemId,
    pub timestamp: DateTime<Utc>,
    /// Instant-buy (low) price.
    pub buy_price: Price,
    /// Instant-sell (high) price.
    pub sell_price: Price,
}

/// The single current derived-indicator record for an item.
///
/// Every indicator field is `0.0` while the item's history is shorter than the
/// indicator's window. A zero therefore means "not yet meaningful" below 5
/// observations (SMA), 15 (RSI-14) or 27 (MACD 12/26/9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub item_id: ItemId,
    pub sma5_buy: f64,
    pub sma5_sell: f64,
    pub rsi14: f64,
    pub macd_line: f64,
    pub macd_signal: f64,
    pub macd_hist: f64,
    /// Timestamp of the newest observation the snapshot was computed from
    /// (Unix epoch when the item has no observations yet).
    pub last_updated: DateTime<Utc>,
}

impl AnalyticsSnapshot {
    /// Expected profit per unit: sell average minus buy average.
    pub fn margin(&self) -> f64 {
        self.sma5_sell - self.sma5_buy
    }

    /// Margin as a percentage of the buy average, `0.0` when the buy average
    /// is not positive.
    pub fn margin_pct(&self) -> f64 {
        if self.sma5_buy > 0.0 {
            self.margin() / self.sma5_buy * 100.0
        } else {
            0.0
        }
    }
}

/// A price observation together with the indicator values at that point in
/// the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub timestamp: DateTime<Utc>,
    pub buy_price: Price,
    pub sell_price: Price,
    pub rsi: f64,
    pub macd_line: f64,
    pub macd_signal: f64,
    pub macd_hist: f64,
}
