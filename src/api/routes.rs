//! API route definitions.

use axum::extract::{Query, State};
use axum::{routing::get, Json, Router};
use chrono::TimeDelta;
use serde::Deserialize;
use serde_json::{json, Value};

use super::state::AppState;

/// Trailing history served when the caller does not say.
const DEFAULT_HISTORY_MINUTES: i64 = 60;
/// One year; longer than any history the ring can hold.
const MAX_HISTORY_MINUTES: i64 = 60 * 24 * 365;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/metrics/current", get(current_metrics))
        .route("/metrics/history", get(metrics_history))
        .route("/alerts", get(drain_alerts))
        .route("/stats", get(engine_stats))
}

fn meta() -> Value {
    json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    })
}

async fn health() -> Json<Value> {
    Json(json!({
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION")
        },
        "meta": meta()
    }))
}

async fn current_metrics(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.engine.current_metrics().await;
    Json(json!({ "data": snapshot, "meta": meta() }))
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    minutes: Option<i64>,
}

async fn metrics_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Json<Value> {
    let minutes = params
        .minutes
        .unwrap_or(DEFAULT_HISTORY_MINUTES)
        .clamp(0, MAX_HISTORY_MINUTES);
    let history = state.engine.history(TimeDelta::minutes(minutes)).await;
    Json(json!({
        "data": history,
        "meta": { "total": history.len(), "minutes": minutes }
    }))
}

/// Alerts are consumed: each one is returned by exactly one call.
async fn drain_alerts(State(state): State<AppState>) -> Json<Value> {
    let alerts = state.engine.drain_alerts().await;
    Json(json!({ "data": alerts, "meta": { "total": alerts.len() } }))
}

async fn engine_stats(State(state): State<AppState>) -> Json<Value> {
    let stats = state.engine.stats().await;
    Json(json!({ "data": stats, "meta": meta() }))
}
