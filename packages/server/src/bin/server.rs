//! Scheduler server entry point: runs the HTTP admin surface, the scheduler
//! background loop, and the decision-log writer together.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;

use scheduler_core::kernel::logging::{init_tracing, BufferedDecisionLogSink, DecisionLogWriter};
use scheduler_core::kernel::{Config, PolicyStore, Service, ServiceHost};
use scheduler_core::scheduler::{SchedulerControl, SchedulerService};
use scheduler_core::server::build_app;
use scheduler_core::store::postgres::PgStore;

struct HttpService {
    router: axum::Router,
    port: u16,
}

#[async_trait]
impl Service for HttpService {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn run(self: Box<Self>, shutdown: CancellationToken) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .context("failed to bind admin HTTP listener")?;
        tracing::info!(%addr, "admin HTTP surface listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .context("http server error")?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    tracing::info!("starting interpreter scheduler");

    let config = Config::from_env().context("failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    let store = Arc::new(PgStore::new(pool));
    let policy_store = PolicyStore::default();

    let (sink, receiver) = BufferedDecisionLogSink::new(1024);
    let sink = Arc::new(sink);

    let scheduler_service = SchedulerService::new(
        store.clone(),
        policy_store.clone(),
        sink.clone(),
        config.clone(),
    );
    let scheduler_control = SchedulerControl::new(scheduler_service.clone());

    let app = build_app(scheduler_control);
    let log_writer = DecisionLogWriter::new(store.clone(), receiver);

    let host = ServiceHost::new()
        .with_service(scheduler_service)
        .with_service(log_writer)
        .with_service(HttpService {
            router: app,
            port: config.port,
        });

    host.run_until_shutdown().await
}
