use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::scheduler::SchedulerControl;
use crate::store::Store;

use super::routes::{admin, health};

#[derive(Clone)]
pub struct AppState<S: Store> {
    pub scheduler: SchedulerControl<S>,
}

pub fn build_app<S: Store + 'static>(scheduler: SchedulerControl<S>) -> Router {
    let state = Arc::new(AppState { scheduler });

    Router::new()
        .merge(health::routes::<S>())
        .nest("/admin", admin::routes::<S>())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state)
}
