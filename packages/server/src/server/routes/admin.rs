//! Manual scheduler trigger and status, for operators. No booking CRUD is
//! exposed here by design.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::server::app::AppState;
use crate::store::Store;

pub fn routes<S: Store + 'static>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/status", get(status::<S>))
        .route("/run-now", post(run_now::<S>))
}

async fn status<S: Store + 'static>(State(state): State<Arc<AppState<S>>>) -> Json<serde_json::Value> {
    Json(json!(state.scheduler.status()))
}

async fn run_now<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<serde_json::Value>, axum::http::StatusCode> {
    match state.scheduler.run_pass_now().await {
        Ok(decided) => Ok(Json(json!({ "decided": decided }))),
        Err(e) => {
            tracing::error!(error = %e, "manual scheduler trigger failed");
            Err(axum::http::StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
