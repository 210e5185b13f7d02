// =============================================================================
// Central Application State
// =============================================================================
//
// Ties together the injected store handle, the analytics refresher, the
// runtime configuration and the operational status shown by the health
// endpoint. Shared across async tasks via `Arc<AppState>`.
//
// Thread safety:
//   - Atomic counter for completed-cycle tracking.
//   - parking_lot::RwLock for all mutable shared values.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::analytics::AnalyticsRefresher;
use crate::ingest::CycleOutcome;
use crate::runtime_config::RuntimeConfig;
use crate::store::PriceStore;

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

/// A recorded error event for the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

pub struct AppState {
    pub runtime_config: Arc<RwLock<RuntimeConfig>>,
    pub store: Arc<dyn PriceStore>,
    pub refresher: Arc<AnalyticsRefresher>,

    /// Number of ingestion cycles run since startup (completed or skipped).
    pub cycle_count: AtomicU64,
    pub last_cycle: RwLock<Option<CycleOutcome>>,
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    pub start_time: std::time::Instant,
}

impl AppState {
    /// Build the state around an already-opened store handle.
    pub fn new(config: RuntimeConfig, store: Arc<dyn PriceStore>) -> Self {
        let refresher = Arc::new(AnalyticsRefresher::new(store.clone()));
        Self {
            runtime_config: Arc::new(RwLock::new(config)),
            store,
            refresher,
            cycle_count: AtomicU64::new(0),
            last_cycle: RwLock::new(None),
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    /// Record an error message, evicting the oldest beyond
    /// [`MAX_RECENT_ERRORS`].
    pub fn push_error(&self, message: String) {
        let mut errors = self.recent_errors.write();
        errors.push(ErrorRecord {
            message,
            at: Utc::now().to_rfc3339(),
        });
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
    }

    /// Store the outcome of an ingestion cycle and log its failures.
    pub fn record_cycle(&self, outcome: CycleOutcome) {
        match &outcome {
            CycleOutcome::Skipped { reason, .. } => {
                self.push_error(format!("cycle skipped: {reason}"));
            }
            CycleOutcome::Completed { summary, .. } => {
                for item_id in &summary.append_failures {
                    self.push_error(format!("failed to record price for item {item_id}"));
                }
                for item_id in &summary.refresh_failures {
                    self.push_error(format!("analytics refresh failed for item {item_id}"));
                }
            }
        }
        *self.last_cycle.write() = Some(outcome);
        self.cycle_count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn health(&self) -> HealthSnapshot {
        HealthSnapshot {
            status: "ok",
            uptime_secs: self.start_time.elapsed().as_secs(),
            cycles: self.cycle_count.load(Ordering::SeqCst),
            last_cycle: self.last_cycle.read().clone(),
            recent_errors: self.recent_errors.read().clone(),
            server_time: Utc::now().timestamp_millis(),
        }
    }
}

/// Serialisable view of the engine's operational status.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: &'static str,
    pub uptime_secs: u64,
    pub cycles: u64,
    pub last_cycle: Option<CycleOutcome>,
    pub recent_errors: Vec<ErrorRecord>,
    pub server_time: i64,
}
