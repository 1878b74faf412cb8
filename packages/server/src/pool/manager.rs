//! Deferred-booking pool manager: claims bookings whose decision window has
//! elapsed and hands them to the assignment engine in batches.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::BatchId;
use crate::engine::Assigner;
use crate::kernel::{EngineResult, PolicyStore};
use crate::store::Store;

use super::readiness;

pub struct PoolManager<S: Store> {
    store: Arc<S>,
    assigner: Assigner<S>,
    policy_store: PolicyStore,
}

impl<S: Store> Clone for PoolManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            assigner: self.assigner.clone(),
            policy_store: self.policy_store.clone(),
        }
    }
}

impl<S: Store> PoolManager<S> {
    pub fn new(store: Arc<S>, policy_store: PolicyStore) -> Self {
        Self {
            store: store.clone(),
            assigner: Assigner::new(store),
            policy_store,
        }
    }

    /// Runs one pool sweep: claims up to `batch_size` ready bookings and
    /// decides each, pushing decision logs through `on_decision`.
    pub async fn run_batch(
        &self,
        batch_size: i64,
        worker_id: &str,
        lease: chrono::Duration,
        on_decision: impl Fn(crate::domain::AssignmentDecisionLog),
    ) -> EngineResult<usize> {
        let now = chrono::Utc::now();
        let claimed = self
            .store
            .claim_ready_pool_bookings(batch_size, worker_id, lease, now)
            .await?;

        if claimed.is_empty() {
            return Ok(0);
        }

        info!(count = claimed.len(), "pool sweep claimed ready bookings");
        let policy = self.policy_store.current();
        let batch_id = BatchId::new();
        let mut decided = 0usize;

        for booking in claimed {
            if !readiness::is_ready(&booking, now) {
                warn!(booking_id = %booking.id, "claimed booking no longer ready, skipping this pass");
                continue;
            }
            match self.assigner.assign(booking, &policy, batch_id).await {
                Ok(log) => {
                    on_decision(log);
                    decided += 1;
                }
                Err(e) => warn!(error = %e, "pool decision failed for this booking"),
            }
        }

        Ok(decided)
    }
}
