// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// Read-only views over the price store plus an on-demand refresh. CORS is
// permissive so the browser dashboard can be served from another origin.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::analytics::{current_snapshot, history_with_indicators};
use crate::app_state::AppState;
use crate::flips::{categorize_flips, suggest_flips};
use crate::store::StoreError;
use crate::types::ItemId;

type ApiError = (StatusCode, Json<Value>);

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/items/tracked", get(tracked_items))
        .route("/api/items/:id/history", get(item_history))
        .route("/api/items/:id/analytics", get(item_analytics))
        .route("/api/items/:id/refresh", post(refresh_item))
        .route("/api/flips/suggest", get(flips_suggest))
        .route("/api/flips/categorized", get(flips_categorized))
        .layer(cors)
        .with_state(state)
}

fn store_failure(context: &'static str, e: StoreError) -> ApiError {
    error!(error = %e, "{context}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Database error" })),
    )
}

// =============================================================================
// Health
// =============================================================================

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.health())
}

// =============================================================================
// Items
// =============================================================================

async fn tracked_items(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let items = state.runtime_config.read().tracked_items.clone();
    Json(json!({
        "count": items.len(),
        "items": items,
    }))
}

async fn item_history(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<ItemId>,
) -> Result<impl IntoResponse, ApiError> {
    let history = history_with_indicators(state.store.as_ref(), item_id)
        .await
        .map_err(|e| store_failure("history query failed", e))?;

    Ok(Json(json!({
        "item_id": item_id,
        "history": history,
    })))
}

async fn item_analytics(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<ItemId>,
) -> Result<impl IntoResponse, ApiError> {
    match current_snapshot(state.store.as_ref(), item_id).await {
        Ok(Some(snapshot)) => Ok(Json(snapshot)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("No analytics for item {item_id}") })),
        )),
        Err(e) => Err(store_failure("snapshot query failed", e)),
    }
}

async fn refresh_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<ItemId>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state
        .refresher
        .refresh(item_id)
        .await
        .map_err(|e| store_failure("on-demand refresh failed", e.source))?;

    info!(item_id, "analytics refreshed via API");
    Ok(Json(snapshot))
}

// =============================================================================
// Flip suggestions
// =============================================================================

async fn flips_suggest(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let max_buy = state.runtime_config.read().max_suggest_buy_price;
    let snapshots = state
        .store
        .list_snapshots()
        .await
        .map_err(|e| store_failure("snapshot listing failed", e))?;

    Ok(Json(json!({
        "suggested_flips": suggest_flips(&snapshots, max_buy),
    })))
}

async fn flips_categorized(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let snapshots = state
        .store
        .list_snapshots()
        .await
        .map_err(|e| store_failure("snapshot listing failed", e))?;

    Ok(Json(json!({
        "categories": categorize_flips(&snapshots),
        "timestamp": chrono::Utc::now().timestamp(),
    })))
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime_config::RuntimeConfig;
    use crate::store::{InMemoryPriceStore, PriceStore};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::{TimeZone, Utc};
    use tower::ServiceExt;

    async fn seeded_state() -> Arc<AppState> {
        let store = Arc::new(InMemoryPriceStore::new());
        for i in 0..30i64 {
            let ts = Utc.timestamp_opt(1_700_000_000 + i * 600, 0).unwrap();
            store.append_price_at(4151, ts, 1_000_000 + i * 1_000, 1_100_000 + i * 1_000).await.unwrap();
        }
        let mut config = RuntimeConfig::default();
        config.tracked_items = vec![4151];
        Arc::new(AppState::new(config, store))
    }

    async fn get_json(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let resp = app
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    #[tokio::test]
    async fn health_is_public() {
        let state = seeded_state().await;
        let (status, body) = get_json(router(state), "GET", "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["cycles"], 0);
    }

    #[tokio::test]
    async fn analytics_missing_until_refreshed() {
        let state = seeded_state().await;

        let (status, _) = get_json(router(state.clone()), "GET", "/api/items/4151/analytics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = get_json(router(state.clone()), "POST", "/api/items/4151/refresh").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["item_id"], 4151);

        let (status, body) = get_json(router(state), "GET", "/api/items/4151/analytics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["rsi14"].as_f64().unwrap() > 0.0);
        assert!(body["macd_line"].as_f64().unwrap() != 0.0);
    }

    #[tokio::test]
    async fn history_is_newest_first() {
        let state = seeded_state().await;
        let (status, body) = get_json(router(state), "GET", "/api/items/4151/history").await;
        assert_eq!(status, StatusCode::OK);

        let rows = body["history"].as_array().unwrap();
        assert_eq!(rows.len(), 30);
        assert_eq!(rows[0]["buy_price"], 1_029_000);
        assert_eq!(rows[29]["buy_price"], 1_000_000);
        assert_eq!(rows[29]["rsi"], 0.0);
    }

    #[tokio::test]
    async fn invalid_item_id_is_rejected() {
        let state = seeded_state().await;
        let (status, _) = get_json(router(state), "GET", "/api/items/abc/history").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn flip_endpoints_rank_refreshed_items() {
        let state = seeded_state().await;
        state.refresher.refresh(4151).await.unwrap();

        let (status, body) = get_json(router(state.clone()), "GET", "/api/flips/suggest").await;
        assert_eq!(status, StatusCode::OK);
        let flips = body["suggested_flips"].as_array().unwrap();
        assert_eq!(flips.len(), 1);
        assert_eq!(flips[0]["item_id"], 4151);
        assert_eq!(flips[0]["profit"], 100_000.0);

        let (status, body) = get_json(router(state), "GET", "/api/flips/categorized").await;
        assert_eq!(status, StatusCode::OK);
        let categories = body["categories"].as_array().unwrap();
        assert_eq!(categories.len(), 6);
        assert_eq!(categories[0]["name"], "High Value Items");
        assert_eq!(categories[0]["count"], 1);
    }

    #[tokio::test]
    async fn tracked_items_reflect_config() {
        let state = seeded_state().await;
        let (_, body) = get_json(router(state), "GET", "/api/items/tracked").await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["items"][0], 4151);
    }
}
