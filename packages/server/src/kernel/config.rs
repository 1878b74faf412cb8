//! Process configuration and hot-reloadable scheduling policy.
//!
//! [`Config`] is read once from the environment at process boot and is fixed
//! for the process lifetime. [`Policy`] is business configuration that can
//! change while the process runs (an operator tightening fairness weights,
//! switching to `Urgent` mode ahead of a holiday) — it lives behind
//! [`PolicyStore`], an atomically-swappable snapshot so in-flight scheduler
//! passes never observe a half-updated policy.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::env;

use crate::domain::MeetingType;

/// Process-level configuration, sourced once from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub instance_id: String,

    /// How often the interval-based scheduler pass runs.
    pub scheduler_interval_secs: u64,
    /// Cron expression for the daily batch-commit tick (pool decisions).
    pub daily_cron: String,
    /// Lease duration granted to a scheduler pass when it claims a booking.
    pub lock_lease_ms: i64,
    /// Claim batch size per pass.
    pub claim_batch_size: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            instance_id: env::var("INSTANCE_ID")
                .unwrap_or_else(|_| format!("scheduler-{}", uuid::Uuid::new_v4())),
            scheduler_interval_secs: env::var("SCHEDULER_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("SCHEDULER_INTERVAL_SECS must be a valid number")?,
            daily_cron: env::var("SCHEDULER_DAILY_CRON")
                .unwrap_or_else(|_| "0 0 18 * * *".to_string()),
            lock_lease_ms: env::var("SCHEDULER_LOCK_LEASE_MS")
                .unwrap_or_else(|_| "120000".to_string())
                .parse()
                .context("SCHEDULER_LOCK_LEASE_MS must be a valid number")?,
            claim_batch_size: env::var("SCHEDULER_CLAIM_BATCH_SIZE")
                .unwrap_or_else(|_| "25".to_string())
                .parse()
                .context("SCHEDULER_CLAIM_BATCH_SIZE must be a valid number")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Mode {
    #[default]
    Normal,
    Urgent,
    Balance,
    Custom,
}

/// Weights applied to each scoring component; see
/// [`crate::engine::scoring::score_candidate`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub fairness_weight: f64,
    pub recency_weight: f64,
    pub language_match_weight: f64,
    pub visibility_spread_weight: f64,
    pub dr_weight: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            fairness_weight: 1.0,
            // recency is a tie-breaking nudge, not a primary signal
            recency_weight: 0.5,
            language_match_weight: 1.0,
            visibility_spread_weight: 1.0,
            dr_weight: 1.0,
        }
    }
}

/// How long a non-urgent booking waits in the deferred pool before the
/// scheduler is forced to decide, keyed by meeting type. `Urgent` and
/// `President` meetings always bypass the pool (see
/// [`crate::pool::readiness`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionWindows {
    windows: HashMap<String, chrono::Duration>,
    default_hours: i64,
}

impl DecisionWindows {
    pub fn new(default_hours: i64) -> Self {
        Self {
            windows: HashMap::new(),
            default_hours,
        }
    }

    pub fn set(&mut self, meeting_type: MeetingType, hours: i64) {
        self.windows
            .insert(format!("{:?}", meeting_type), chrono::Duration::hours(hours));
    }

    pub fn get(&self, meeting_type: MeetingType) -> chrono::Duration {
        self.windows
            .get(&format!("{:?}", meeting_type))
            .copied()
            .unwrap_or_else(|| chrono::Duration::hours(self.default_hours))
    }
}

/// Business-level scheduling policy. Hot-reloadable via [`PolicyStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub mode: Mode,
    pub weights: ScoreWeights,

    /// Rolling window, in days, over which fairness load is averaged.
    pub fairness_window_days: i64,
    /// Max consecutive DR assignments before an interpreter is blocked from
    /// a further DR booking.
    pub consecutive_dr_limit: u32,
    /// Whether PR_PR and DR_PR count as the same stream for the consecutive
    /// tracker.
    pub dr_bucket_together: bool,
    /// Penalty (in hours, folded into the DR score component) applied per
    /// consecutive DR assignment once the streak reaches 1 but before it
    /// reaches `consecutive_dr_limit`.
    pub dr_consecutive_penalty_hours: f64,

    /// Minimum gap, in minutes, required between two bookings for the same
    /// interpreter to not be classified as adjacent-conflicting.
    pub conflict_buffer_minutes: i64,

    /// Days-until-`timeStart` at or below which a pooled booking is treated
    /// as urgency-class for readiness-window purposes (see
    /// [`crate::pool::readiness`]).
    pub urgent_threshold_days: f64,
    /// Days-until-`timeStart` a general (non-urgency-class) booking waits
    /// before its decision window opens.
    pub general_threshold_days: f64,

    /// Attempts allowed before a booking that keeps finding no eligible
    /// candidate is surfaced as `PoolStatus::Failed` for manual handling.
    pub max_auto_assign_attempts: u32,
    /// Base backoff, in minutes, for `min(maxBackoff, base * 2^attempts)`.
    pub backoff_base_minutes: i64,
    /// Ceiling on the backoff computed above.
    pub max_backoff_minutes: i64,

    #[serde(skip)]
    pub decision_windows: Option<DecisionWindows>,

    /// Score below which a candidate is excluded even if otherwise eligible.
    pub min_acceptable_score: f64,
}

impl Default for Policy {
    fn default() -> Self {
        let mut windows = DecisionWindows::new(4);
        windows.set(MeetingType::Weekly, 24);
        windows.set(MeetingType::General, 8);
        windows.set(MeetingType::Vip, 2);
        Self {
            mode: Mode::Normal,
            weights: ScoreWeights::default(),
            fairness_window_days: 30,
            consecutive_dr_limit: 2,
            dr_bucket_together: false,
            dr_consecutive_penalty_hours: 4.0,
            conflict_buffer_minutes: 15,
            urgent_threshold_days: 3.0,
            general_threshold_days: 14.0,
            max_auto_assign_attempts: 5,
            backoff_base_minutes: 5,
            max_backoff_minutes: 240,
            decision_windows: Some(windows),
            min_acceptable_score: 0.0,
        }
    }
}

impl Policy {
    /// Stable digest of the policy in force, recorded on every decision log
    /// entry so a later audit can tell which policy produced a given
    /// assignment.
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self.mode));
        hasher.update(self.weights.fairness_weight.to_le_bytes());
        hasher.update(self.weights.recency_weight.to_le_bytes());
        hasher.update(self.weights.language_match_weight.to_le_bytes());
        hasher.update(self.weights.visibility_spread_weight.to_le_bytes());
        hasher.update(self.weights.dr_weight.to_le_bytes());
        hasher.update(self.fairness_window_days.to_le_bytes());
        hasher.update(self.consecutive_dr_limit.to_le_bytes());
        hasher.update([self.dr_bucket_together as u8]);
        hasher.update(self.dr_consecutive_penalty_hours.to_le_bytes());
        hasher.update(self.conflict_buffer_minutes.to_le_bytes());
        hasher.update(self.urgent_threshold_days.to_le_bytes());
        hasher.update(self.general_threshold_days.to_le_bytes());
        hasher.update(self.max_auto_assign_attempts.to_le_bytes());
        hasher.update(self.backoff_base_minutes.to_le_bytes());
        hasher.update(self.max_backoff_minutes.to_le_bytes());
        hasher.update(self.min_acceptable_score.to_le_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn decision_window_for(&self, meeting_type: MeetingType) -> chrono::Duration {
        self.decision_windows
            .as_ref()
            .map(|w| w.get(meeting_type))
            .unwrap_or_else(|| chrono::Duration::hours(4))
    }
}

/// Atomically-swappable policy snapshot shared across the engine.
#[derive(Clone)]
pub struct PolicyStore {
    inner: Arc<RwLock<Arc<Policy>>>,
}

impl PolicyStore {
    pub fn new(policy: Policy) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(policy))),
        }
    }

    pub fn current(&self) -> Arc<Policy> {
        self.inner.read().expect("policy lock poisoned").clone()
    }

    pub fn swap(&self, policy: Policy) {
        *self.inner.write().expect("policy lock poisoned") = Arc::new(policy);
    }
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new(Policy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_hash_is_stable_for_identical_policy() {
        let a = Policy::default();
        let b = Policy::default();
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn policy_hash_changes_with_weights() {
        let a = Policy::default();
        let mut b = Policy::default();
        b.weights.fairness_weight = 0.9;
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn policy_store_swap_is_visible_to_new_readers() {
        let store = PolicyStore::default();
        let mut updated = (*store.current()).clone();
        updated.mode = Mode::Urgent;
        store.swap(updated);
        assert_eq!(store.current().mode, Mode::Urgent);
    }

    #[test]
    fn decision_window_falls_back_to_default_for_unconfigured_type() {
        let policy = Policy::default();
        assert_eq!(
            policy.decision_window_for(MeetingType::Dr),
            chrono::Duration::hours(4)
        );
        assert_eq!(
            policy.decision_window_for(MeetingType::Weekly),
            chrono::Duration::hours(24)
        );
    }
}
