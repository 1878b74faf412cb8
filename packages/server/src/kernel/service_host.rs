//! Minimal long-running service harness.
//!
//! Each background loop in this crate (the scheduler pass, the pool
//! readiness sweep, the decision-log sink) implements [`Service`] and is
//! registered with a [`ServiceHost`], which runs them concurrently and stops
//! them all on the same `CancellationToken` when a shutdown signal arrives.

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[async_trait]
pub trait Service: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(self: Box<Self>, shutdown: CancellationToken) -> Result<()>;
}

#[derive(Default)]
pub struct ServiceHost {
    services: Vec<Box<dyn Service>>,
    shutdown: CancellationToken,
}

impl ServiceHost {
    pub fn new() -> Self {
        Self {
            services: Vec::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_service(mut self, service: impl Service + 'static) -> Self {
        self.services.push(Box::new(service));
        self
    }

    pub fn shutdown_handle(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs every registered service until the shutdown token fires, then
    /// waits for all of them to return.
    pub async fn run_until_shutdown(self) -> Result<()> {
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("received shutdown signal");
                shutdown.cancel();
            }
        });

        let mut handles = Vec::with_capacity(self.services.len());
        for service in self.services {
            let name = service.name();
            let token = self.shutdown.clone();
            handles.push(tokio::spawn(async move {
                info!(service = name, "starting service");
                if let Err(e) = service.run(token).await {
                    error!(service = name, error = %e, "service exited with error");
                }
                info!(service = name, "service stopped");
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct Flag(Arc<AtomicBool>);

    #[async_trait]
    impl Service for Flag {
        fn name(&self) -> &'static str {
            "flag"
        }

        async fn run(self: Box<Self>, shutdown: CancellationToken) -> Result<()> {
            shutdown.cancelled().await;
            self.0.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn service_runs_until_cancellation() {
        let ran = Arc::new(AtomicBool::new(false));
        let host = ServiceHost::new().with_service(Flag(ran.clone()));
        let shutdown = host.shutdown_handle();

        let handle = tokio::spawn(host.run_until_shutdown());
        tokio::task::yield_now().await;
        shutdown.cancel();
        handle.await.unwrap().unwrap();

        assert!(ran.load(Ordering::SeqCst));
    }
}
