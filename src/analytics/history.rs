// =============================================================================
// Indicator read path
// =============================================================================
//
// History with indicators is computed over the ascending history and
// delivered newest first. The current snapshot is read straight from the
// store with no recomputation.
// =============================================================================

use crate::indicators::{calculate_macd, calculate_rsi, FAST_PERIOD, RSI_PERIOD, SIGNAL_PERIOD, SLOW_PERIOD};
use crate::store::{PriceStore, StoreResult};
use crate::types::{AnalyticsSnapshot, IndicatorRow, ItemId, PricePoint};

/// Attach RSI-14 and MACD(12, 26, 9) values to every observation in
/// `history` (oldest first). Returns the rows newest first.
pub fn indicator_rows(history: &[PricePoint]) -> Vec<IndicatorRow> {
    let buys: Vec<f64> = history.iter().map(|p| p.buy_price as f64).collect();
    let rsi = calculate_rsi(&buys, RSI_PERIOD);
    let macd = calculate_macd(&buys, FAST_PERIOD, SLOW_PERIOD, SIGNAL_PERIOD);

    let at = |series: &[f64], i: usize| series.get(i).copied().unwrap_or(0.0);

    let mut rows: Vec<IndicatorRow> = history
        .iter()
        .enumerate()
        .map(|(i, p)| IndicatorRow {
            timestamp: p.timestamp,
            buy_price: p.buy_price,
            sell_price: p.sell_price,
            rsi: rsi[i],
            macd_line: at(&macd.line, i),
            macd_signal: at(&macd.signal, i),
            macd_hist: at(&macd.histogram, i),
        })
        .collect();
    rows.reverse();
    rows
}

pub async fn history_with_indicators(store: &dyn PriceStore, item_id: ItemId) -> StoreResult<Vec<IndicatorRow>> {
    let history = store.query_ascending(item_id).await?;
    Ok(indicator_rows(&history))
}

pub async fn current_snapshot(store: &dyn PriceStore, item_id: ItemId) -> StoreResult<Option<AnalyticsSnapshot>> {
    store.get_snapshot(item_id).await
}
