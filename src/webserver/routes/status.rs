/// Health and cache-metrics endpoint
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::webserver::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/status", get(status))
}

async fn status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let metrics = state.cache.metrics();
    Json(json!({
        "status": "ok",
        "uptime_seconds": state.uptime_seconds(),
        "cache": {
            "enabled": state.config.cache.enabled,
            "hits": metrics.hits,
            "misses": metrics.misses,
            "writes": metrics.writes,
            "store_errors": metrics.store_errors,
            "decode_errors": metrics.decode_errors,
            "hit_rate": metrics.hit_rate(),
        },
    }))
}
