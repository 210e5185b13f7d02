// =============================================================================
// Runtime Configuration — JSON settings with atomic save
// =============================================================================
//
// Every tunable lives here. All fields carry `#[serde(default)]` so that
// adding a new field never breaks loading an older config file. Persistence
// uses an atomic tmp + rename pattern to prevent corruption on crash.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::ItemId;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

/// Popular high-volume items: weapons, armour, consumables, jewellery,
/// resources, runes, herbs, potions, ores and bars.
fn default_tracked_items() -> Vec<ItemId> {
    vec![
        4151, 11802, 11804, 11806, 11808, 13576, 13652, //
        11840, 12006, 12928, 12929, 12930, 12931, //
        2, 560, 384, 386, 388, 390, 392, 394, //
        6585, 1704, 1712, 1725, 1731, //
        1513, 1515, 1517, 1519, 1521, 1623, 1625, 1627, 1629, 1631, //
        554, 555, 556, 557, 558, 559, 561, 562, 563, 564, 565, //
        199, 201, 203, 205, 207, 209, 211, 213, 215, 217, 219, 2485, //
        2436, 113, 115, 117, 119, 121, 123, 125, 127, 129, 131, 133, //
        440, 442, 444, 446, 447, 449, 451, 453, //
        2349, 2351, 2353, 2355, 2357, 2359, 2361, 2363,
    ]
}

fn default_fetch_interval_secs() -> u64 {
    600
}

fn default_refresh_concurrency() -> usize {
    8
}

fn default_database_url() -> String {
    "sqlite://flips.db".to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_price_api_url() -> String {
    "https://prices.runescape.wiki/api/v1/osrs/latest".to_string()
}

fn default_user_agent() -> String {
    concat!("flip-engine/", env!("CARGO_PKG_VERSION"), " (price analytics)").to_string()
}

fn default_max_suggest_buy_price() -> f64 {
    200_000_000.0
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Items recorded and analysed every cycle.
    #[serde(default = "default_tracked_items")]
    pub tracked_items: Vec<ItemId>,

    /// Seconds between ingestion cycles.
    #[serde(default = "default_fetch_interval_secs")]
    pub fetch_interval_secs: u64,

    /// Maximum number of item refreshes in flight at once.
    #[serde(default = "default_refresh_concurrency")]
    pub refresh_concurrency: usize,

    /// `sqlite://<path>` for a file database, or `memory` for the in-process
    /// store.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_price_api_url")]
    pub price_api_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Items whose buy average is at or above this are left out of the
    /// suggestion list (thinly traded, very expensive items).
    #[serde(default = "default_max_suggest_buy_price")]
    pub max_suggest_buy_price: f64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tracked_items: default_tracked_items(),
            fetch_interval_secs: default_fetch_interval_secs(),
            refresh_concurrency: default_refresh_concurrency(),
            database_url: default_database_url(),
            bind_addr: default_bind_addr(),
            price_api_url: default_price_api_url(),
            user_agent: default_user_agent(),
            max_suggest_buy_price: default_max_suggest_buy_price(),
        }
    }
}

/// Parse a comma-separated list of item ids, skipping blanks and reporting
/// entries that are not numbers.
pub fn parse_item_list(raw: &str) -> Vec<ItemId> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<ItemId>() {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(entry = %s, error = %e, "ignoring invalid item id");
                None
            }
        })
        .collect()
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            tracked = config.tracked_items.len(),
            interval_secs = config.fetch_interval_secs,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Apply `FLIP_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("FLIP_DATABASE_URL") {
            self.database_url = url;
        }
        if let Ok(addr) = std::env::var("FLIP_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Ok(items) = std::env::var("FLIP_TRACKED_ITEMS") {
            let parsed = parse_item_list(&items);
            if !parsed.is_empty() {
                self.tracked_items = parsed;
            }
        }
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }
}
