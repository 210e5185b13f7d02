// =============================================================================
// Analytics pipeline — per-item snapshot refresh and indicator read path
// =============================================================================

pub mod history;
pub mod refresher;

use thiserror::Error;

use crate::store::StoreError;
use crate::types::ItemId;

pub use history::{current_snapshot, history_with_indicators, indicator_rows};
pub use refresher::{compute_snapshot, AnalyticsRefresher, RefreshReport};

/// A refresh that failed for a single item. The item's previous snapshot is
/// left untouched.
#[derive(Debug, Error)]
#[error("analytics refresh failed for item {item_id}: {source}")]
pub struct RefreshError {
    pub item_id: ItemId,
    #[source]
    pub source: StoreError,
}
