//! Admin-facing control surface for the scheduler service: manual trigger
//! and a status snapshot, used by the HTTP admin routes and the CLI.

use std::sync::atomic::Ordering;

use serde::Serialize;

use super::service::{SchedulerService, SchedulerStats};
use crate::kernel::EngineResult;
use crate::store::Store;

#[derive(Debug, Serialize)]
pub struct SchedulerStatus {
    pub last_pass_at_unix: i64,
    pub last_pass_decided: i64,
    pub total_decided: i64,
}

impl From<&SchedulerStats> for SchedulerStatus {
    fn from(stats: &SchedulerStats) -> Self {
        Self {
            last_pass_at_unix: stats.last_pass_at_unix.load(Ordering::Relaxed),
            last_pass_decided: stats.last_pass_decided.load(Ordering::Relaxed),
            total_decided: stats.total_decided.load(Ordering::Relaxed),
        }
    }
}

/// Thin handle to a running [`SchedulerService`] for out-of-band control.
/// Does not own the service's lifecycle (that's [`crate::kernel::ServiceHost`]'s
/// job) — just exposes read access to its stats and a way to force a pass.
pub struct SchedulerControl<S: Store> {
    service: SchedulerService<S>,
}

impl<S: Store> Clone for SchedulerControl<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
        }
    }
}

impl<S: Store + 'static> SchedulerControl<S> {
    pub fn new(service: SchedulerService<S>) -> Self {
        Self { service }
    }

    pub async fn run_pass_now(&self) -> EngineResult<usize> {
        self.service.run_pass().await.map_err(Into::into)
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus::from(self.service.stats().as_ref())
    }
}
