// =============================================================================
// Price Ingestion — upstream price feed and the periodic batch cycle
// =============================================================================
//
// Every cycle pulls the latest instant-buy/instant-sell prices for all items,
// appends one observation per tracked item, then refreshes analytics for the
// items that received a new observation. A failed upstream fetch skips the
// whole cycle; the next tick simply tries again.
// =============================================================================

pub mod cycle;
pub mod wiki;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ItemId, Price};

pub use cycle::{run_cycle, run_ingest_loop, CycleOutcome, CycleSummary};
pub use wiki::WikiPriceClient;

/// Latest traded prices for one item. Either side may be missing when the
/// item has not traded recently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestPrice {
    /// Instant-sell price, recorded as the observation's sell price.
    #[serde(default)]
    pub high: Option<Price>,
    /// Instant-buy price, recorded as the observation's buy price.
    #[serde(default)]
    pub low: Option<Price>,
}

impl LatestPrice {
    /// `(buy, sell)` when both sides are known.
    pub fn buy_sell(&self) -> Option<(Price, Price)> {
        Some((self.low?, self.high?))
    }
}

/// Failure fetching prices from the upstream feed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode price feed: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Source of the latest prices for every item.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_latest(&self) -> Result<HashMap<ItemId, LatestPrice>, FetchError>;
}
