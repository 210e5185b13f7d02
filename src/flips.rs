// =============================================================================
// Flip Ranking — profit opportunities derived from analytics snapshots
// =============================================================================
//
// Margin is `sma5_sell - sma5_buy`. Only snapshots with both averages
// positive are considered; everything else is an item without enough data.
// =============================================================================

use serde::Serialize;

use crate::types::{AnalyticsSnapshot, ItemId};

/// Number of entries returned per list.
pub const FLIP_LIMIT: usize = 10;

/// Items with high exchange buy limits: runes, cannonballs, food, herbs, ores
/// and bars.
const HIGH_LIMIT_ITEMS: &[ItemId] = &[
    2, 560, 561, 562, 563, 564, 565, //
    384, 386, 373, 361, //
    199, 201, 203, 205, 207, 209, 211, 213, 215, 217, 219, //
    440, 442, 444, 447, 449, 451, 453, //
    2349, 2351, 2353, 2355, 2357, 2359, 2361, 2363,
];

/// One ranked flip opportunity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flip {
    pub item_id: ItemId,
    pub sma5_buy: f64,
    pub sma5_sell: f64,
    pub profit: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_percentage: Option<f64>,
}

impl Flip {
    fn from_snapshot(s: &AnalyticsSnapshot) -> Self {
        Self {
            item_id: s.item_id,
            sma5_buy: s.sma5_buy,
            sma5_sell: s.sma5_sell,
            profit: s.margin(),
            margin_percentage: None,
        }
    }
}

/// A named group of flips.
#[derive(Debug, Clone, Serialize)]
pub struct FlipCategory {
    pub name: &'static str,
    pub description: &'static str,
    pub items: Vec<Flip>,
    pub count: usize,
}

impl FlipCategory {
    fn new(name: &'static str, description: &'static str, items: Vec<Flip>) -> Self {
        Self {
            name,
            description,
            count: items.len(),
            items,
        }
    }
}

fn priced(s: &&AnalyticsSnapshot) -> bool {
    s.sma5_buy > 0.0 && s.sma5_sell > 0.0
}

fn profitable(s: &&AnalyticsSnapshot) -> bool {
    priced(s) && s.margin() > 0.0
}

/// Sort by `key` descending, keep the first [`FLIP_LIMIT`].
fn top_by<F>(mut picked: Vec<&AnalyticsSnapshot>, key: F) -> Vec<&AnalyticsSnapshot>
where
    F: Fn(&AnalyticsSnapshot) -> f64,
{
    picked.sort_by(|a, b| key(b).total_cmp(&key(a)).then(a.item_id.cmp(&b.item_id)));
    picked.truncate(FLIP_LIMIT);
    picked
}

fn by_margin(picked: Vec<&AnalyticsSnapshot>) -> Vec<Flip> {
    top_by(picked, AnalyticsSnapshot::margin)
        .into_iter()
        .map(Flip::from_snapshot)
        .collect()
}

/// Top flips by absolute margin among items bought for less than `max_buy`.
pub fn suggest_flips(snapshots: &[AnalyticsSnapshot], max_buy: f64) -> Vec<Flip> {
    by_margin(
        snapshots
            .iter()
            .filter(priced)
            .filter(|s| s.sma5_buy < max_buy)
            .collect(),
    )
}

fn value_range(snapshots: &[AnalyticsSnapshot], min: f64, max: f64) -> Vec<Flip> {
    by_margin(
        snapshots
            .iter()
            .filter(profitable)
            .filter(|s| (min..=max).contains(&s.sma5_buy))
            .collect(),
    )
}

fn high_margin(snapshots: &[AnalyticsSnapshot], min_pct: f64) -> Vec<Flip> {
    let picked = snapshots
        .iter()
        .filter(profitable)
        .filter(|s| s.margin_pct() >= min_pct)
        .collect();
    top_by(picked, AnalyticsSnapshot::margin_pct)
        .into_iter()
        .map(|s| Flip {
            margin_percentage: Some(s.margin_pct()),
            ..Flip::from_snapshot(s)
        })
        .collect()
}

fn high_volume(snapshots: &[AnalyticsSnapshot]) -> Vec<Flip> {
    by_margin(
        snapshots
            .iter()
            .filter(profitable)
            .filter(|s| HIGH_LIMIT_ITEMS.contains(&s.item_id))
            .collect(),
    )
}

fn quick_flips(snapshots: &[AnalyticsSnapshot]) -> Vec<Flip> {
    by_margin(
        snapshots
            .iter()
            .filter(priced)
            .filter(|s| (100.0..=50_000.0).contains(&s.margin()) && s.sma5_buy < 500_000.0)
            .collect(),
    )
}

/// Group opportunities into the fixed set of categories shown on the
/// dashboard.
pub fn categorize_flips(snapshots: &[AnalyticsSnapshot]) -> Vec<FlipCategory> {
    vec![
        FlipCategory::new(
            "High Value Items",
            "Items worth 1M+ GP - High profit potential but requires significant capital",
            value_range(snapshots, 1_000_000.0, 999_999_999.0),
        ),
        FlipCategory::new(
            "Mid Value Items",
            "Items worth 100K-1M GP - Good balance of profit and accessibility",
            value_range(snapshots, 100_000.0, 999_999.0),
        ),
        FlipCategory::new(
            "Budget Items",
            "Items worth less than 100K GP - Low capital required, great for beginners",
            value_range(snapshots, 0.0, 99_999.0),
        ),
        FlipCategory::new(
            "High Margin Items",
            "Items with profit margin >5% of item value - Percentage-based profits",
            high_margin(snapshots, 5.0),
        ),
        FlipCategory::new(
            "High Volume Potential",
            "Items with high GE buy limits - Suitable for bulk trading",
            high_volume(snapshots),
        ),
        FlipCategory::new(
            "Quick Flips",
            "Items with consistent small margins - Fast turnover opportunities",
            quick_flips(snapshots),
        ),
    ]
}
