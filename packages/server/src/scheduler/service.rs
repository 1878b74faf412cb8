//! Scheduler background service: runs the reactive claim-and-assign loop on
//! an interval and a forced pool flush once daily.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::domain::BatchId;
use crate::engine::Assigner;
use crate::kernel::logging::BufferedDecisionLogSink;
use crate::kernel::{Config, PolicyStore, Service};
use crate::pool::PoolManager;
use crate::store::Store;

/// Snapshot of scheduler activity, exposed over the admin surface.
#[derive(Debug, Default)]
pub struct SchedulerStats {
    pub last_pass_at_unix: AtomicI64,
    pub last_pass_decided: AtomicI64,
    pub total_decided: AtomicI64,
}

pub struct SchedulerService<S: Store> {
    store: Arc<S>,
    assigner: Assigner<S>,
    pool_manager: PoolManager<S>,
    policy_store: PolicyStore,
    sink: Arc<BufferedDecisionLogSink>,
    config: Config,
    stats: Arc<SchedulerStats>,
}

impl<S: Store> Clone for SchedulerService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            assigner: self.assigner.clone(),
            pool_manager: self.pool_manager.clone(),
            policy_store: self.policy_store.clone(),
            sink: self.sink.clone(),
            config: self.config.clone(),
            stats: self.stats.clone(),
        }
    }
}

impl<S: Store + 'static> SchedulerService<S> {
    pub fn new(
        store: Arc<S>,
        policy_store: PolicyStore,
        sink: Arc<BufferedDecisionLogSink>,
        config: Config,
    ) -> Self {
        Self {
            store: store.clone(),
            assigner: Assigner::new(store.clone()),
            pool_manager: PoolManager::new(store, policy_store.clone()),
            policy_store,
            sink,
            config,
            stats: Arc::new(SchedulerStats::default()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn stats(&self) -> Arc<SchedulerStats> {
        self.stats.clone()
    }

    /// Claims due bookings and decides each; also sweeps the pool for
    /// bookings whose decision window has elapsed. Returns the number of
    /// bookings decided.
    pub async fn run_pass(&self) -> Result<usize> {
        let now = Utc::now();
        let lease = chrono::Duration::milliseconds(self.config.lock_lease_ms);
        let policy = self.policy_store.current();

        let claimed = self
            .store
            .claim_due_bookings(self.config.claim_batch_size, &self.config.instance_id, lease, now)
            .await?;

        let batch_id = BatchId::new();
        let mut decided = 0usize;
        for booking in claimed {
            match self.assigner.assign(booking, &policy, batch_id).await {
                Ok(log) => {
                    self.sink.push(log);
                    decided += 1;
                }
                Err(e) => error!(error = %e, "assignment pass failed for this booking"),
            }
        }

        let sink = self.sink.clone();
        decided += self
            .pool_manager
            .run_batch(
                self.config.claim_batch_size,
                &self.config.instance_id,
                lease,
                move |log| sink.push(log),
            )
            .await?;

        self.stats
            .last_pass_at_unix
            .store(now.timestamp(), Ordering::Relaxed);
        self.stats
            .last_pass_decided
            .store(decided as i64, Ordering::Relaxed);
        self.stats.total_decided.fetch_add(decided as i64, Ordering::Relaxed);

        Ok(decided)
    }

    async fn run_daily_cron(&self) {
        info!("running daily forced pool flush");
        if let Err(e) = self.run_pass().await {
            error!(error = %e, "daily pool flush failed");
        }
    }
}

#[async_trait]
impl<S: Store + 'static> Service for SchedulerService<S> {
    fn name(&self) -> &'static str {
        "scheduler"
    }

    async fn run(self: Box<Self>, shutdown: CancellationToken) -> Result<()> {
        let scheduler = JobScheduler::new().await?;
        let daily_cron = self.config.daily_cron.clone();

        let daily_self = Arc::new(self);
        let cron_self = daily_self.clone();
        let job = Job::new_async(daily_cron.as_str(), move |_uuid, _lock| {
            let svc = cron_self.clone();
            Box::pin(async move { svc.run_daily_cron().await })
        })?;
        scheduler.add(job).await?;
        scheduler.start().await?;

        let mut interval = tokio::time::interval(StdDuration::from_secs(
            daily_self.config.scheduler_interval_secs,
        ));

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    if let Err(e) = daily_self.run_pass().await {
                        error!(error = %e, "scheduler pass failed");
                    }
                }
            }
        }

        let _ = scheduler.shutdown().await;
        Ok(())
    }
}
