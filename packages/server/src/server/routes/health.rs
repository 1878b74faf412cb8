use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::server::app::AppState;
use crate::store::Store;

pub fn routes<S: Store + 'static>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/health", get(liveness))
        .route("/ready", get(readiness::<S>))
}

async fn liveness() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness<S: Store + 'static>(State(state): State<Arc<AppState<S>>>) -> Json<serde_json::Value> {
    let status = state.scheduler.status();
    Json(json!({ "status": "ok", "scheduler": status }))
}
