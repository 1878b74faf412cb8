//! Structured logging setup and the decision-log sink.
//!
//! [`init_tracing`] wires up `tracing-subscriber` the way the rest of this
//! codebase's services do. [`BufferedDecisionLogSink`] is the durable side
//! channel that persists [`AssignmentDecisionLog`] rows without putting the
//! store on the scheduler's hot path: the engine pushes into an in-memory
//! ring buffer and a background [`Service`] drains it to the store with
//! exponential backoff on failure.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::domain::AssignmentDecisionLog;
use crate::kernel::service_host::Service;
use crate::store::Store;

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,scheduler_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Buffered, best-effort sink for decision logs. Capacity bounds memory use;
/// once full, new entries are dropped and counted rather than blocking the
/// caller (the decision itself must never fail because logging is backed
/// up).
pub struct BufferedDecisionLogSink {
    sender: mpsc::Sender<AssignmentDecisionLog>,
    dropped_count: Arc<AtomicU64>,
}

impl BufferedDecisionLogSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<AssignmentDecisionLog>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (
            Self {
                sender,
                dropped_count: Arc::new(AtomicU64::new(0)),
            },
            receiver,
        )
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    /// Enqueue a decision log entry. Never blocks: if the buffer is full the
    /// entry is dropped and `dropped_count` is incremented.
    pub fn push(&self, entry: AssignmentDecisionLog) {
        if let Err(mpsc::error::TrySendError::Full(_)) = self.sender.try_send(entry) {
            let dropped = self.dropped_count.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(dropped_count = dropped, "decision log buffer full, dropping entry");
        }
    }
}

/// Background service that drains a [`BufferedDecisionLogSink`]'s receiver
/// into a [`Store`], retrying with exponential backoff on write failure.
pub struct DecisionLogWriter<S: Store> {
    store: Arc<S>,
    receiver: tokio::sync::Mutex<mpsc::Receiver<AssignmentDecisionLog>>,
}

impl<S: Store + 'static> DecisionLogWriter<S> {
    pub fn new(store: Arc<S>, receiver: mpsc::Receiver<AssignmentDecisionLog>) -> Self {
        Self {
            store,
            receiver: tokio::sync::Mutex::new(receiver),
        }
    }

    async fn write_with_retry(&self, entry: &AssignmentDecisionLog) {
        let mut attempt = 0u32;
        loop {
            match self.store.write_decision_log(entry).await {
                Ok(()) => return,
                Err(e) => {
                    attempt += 1;
                    error!(error = %e, attempt, booking_id = %entry.booking_id, "failed to persist decision log");
                    if attempt >= 5 {
                        error!(booking_id = %entry.booking_id, "giving up on decision log entry after 5 attempts");
                        return;
                    }
                    let backoff = Duration::from_millis(200 * 2u64.pow(attempt.min(6)));
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[async_trait]
impl<S: Store + 'static> Service for DecisionLogWriter<S> {
    fn name(&self) -> &'static str {
        "decision-log-writer"
    }

    async fn run(self: Box<Self>, shutdown: CancellationToken) -> Result<()> {
        let mut receiver = self.receiver.lock().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                entry = receiver.recv() => {
                    match entry {
                        Some(entry) => self.write_with_retry(&entry).await,
                        None => break,
                    }
                }
            }
        }
        Ok(())
    }
}
