// =============================================================================
// Ingestion Cycle — fetch, append, refresh
// =============================================================================
//
// The loop is designed to be spawned once at startup:
//
//   tokio::spawn(run_ingest_loop(Arc::clone(&state), source));
//
// There is no backpressure: a slow cycle delays the next tick, and a refresh
// that overlaps with a later one for the same item is settled by the store's
// last-writer-wins upsert.
// =============================================================================

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::PriceSource;
use crate::analytics::AnalyticsRefresher;
use crate::app_state::AppState;
use crate::store::PriceStore;
use crate::types::ItemId;

/// What happened during one completed cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleSummary {
    /// Items that received a new observation.
    pub appended: usize,
    /// Tracked items absent from the feed or missing a price side.
    pub missing: Vec<ItemId>,
    pub append_failures: Vec<ItemId>,
    pub refreshed: usize,
    pub refresh_failures: Vec<ItemId>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CycleOutcome {
    Completed {
        at: DateTime<Utc>,
        summary: CycleSummary,
    },
    Skipped {
        at: DateTime<Utc>,
        reason: String,
    },
}

/// Run one ingestion cycle for `tracked` items.
pub async fn run_cycle(
    source: &dyn PriceSource,
    store: &dyn PriceStore,
    refresher: &AnalyticsRefresher,
    tracked: &[ItemId],
    concurrency: usize,
) -> CycleOutcome {
    let started = Instant::now();
    let at = Utc::now();

    let latest = match source.fetch_latest().await {
        Ok(latest) => latest,
        Err(e) => {
            warn!(error = %e, "price fetch failed, skipping cycle");
            return CycleOutcome::Skipped {
                at,
                reason: e.to_string(),
            };
        }
    };

    let mut summary = CycleSummary::default();
    let mut to_refresh = Vec::with_capacity(tracked.len());

    for &item_id in tracked {
        let Some((buy, sell)) = latest.get(&item_id).and_then(|p| p.buy_sell()) else {
            debug!(item_id, "no complete price in feed");
            summary.missing.push(item_id);
            continue;
        };

        match store.append_price(item_id, buy, sell).await {
            Ok(()) => to_refresh.push(item_id),
            Err(e) => {
                warn!(item_id, error = %e, "failed to record price");
                summary.append_failures.push(item_id);
            }
        }
    }
    summary.appended = to_refresh.len();

    let report = refresher.refresh_many(&to_refresh, concurrency).await;
    summary.refreshed = report.refreshed.len();
    summary.refresh_failures = report.failed.iter().map(|e| e.item_id).collect();
    summary.duration_ms = started.elapsed().as_millis() as u64;

    info!(
        appended = summary.appended,
        missing = summary.missing.len(),
        refreshed = summary.refreshed,
        failed = summary.append_failures.len() + summary.refresh_failures.len(),
        duration_ms = summary.duration_ms,
        "ingestion cycle complete"
    );

    CycleOutcome::Completed { at, summary }
}

/// Run the ingestion cycle forever on the configured fixed interval.
pub async fn run_ingest_loop(state: Arc<AppState>, source: Arc<dyn PriceSource>) {
    let period = state.runtime_config.read().fetch_interval_secs.max(1);
    info!(interval_secs = period, "ingestion loop starting");

    let mut ticker = interval(Duration::from_secs(period));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let (tracked, concurrency) = {
            let config = state.runtime_config.read();
            (config.tracked_items.clone(), config.refresh_concurrency)
        };

        let outcome = run_cycle(
            source.as_ref(),
            state.store.as_ref(),
            &state.refresher,
            &tracked,
            concurrency,
        )
        .await;
        state.record_cycle(outcome);
    }
}
