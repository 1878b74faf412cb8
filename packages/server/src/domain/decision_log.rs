//! Assignment decision log: one durable record per scheduler decision.
//!
//! Written by [`crate::engine::assignment`] on every commit/defer/skip so an
//! operator can reconstruct why a given booking ended up with (or without) an
//! interpreter. The `policy_hash` field ties the record to the exact policy
//! snapshot in force at decision time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use typed_builder::TypedBuilder;

use super::ids::{BatchId, BookingId, InterpreterId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "decision_outcome", rename_all = "snake_case")]
pub enum DecisionOutcome {
    Committed,
    Deferred,
    Skipped,
    Failed,
}

/// A snapshot of one candidate interpreter's score at decision time, kept so
/// the winning choice (and near-misses) can be audited after the fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateScore {
    pub interpreter_id: InterpreterId,
    pub score: f64,
    pub fairness_component: f64,
    pub recency_component: f64,
    pub dr_component: f64,
    pub consecutive_dr_blocked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct AssignmentDecisionLog {
    #[builder(default = BookingId::new().into_uuid())]
    pub id: uuid::Uuid,
    pub booking_id: BookingId,
    #[builder(default, setter(strip_option))]
    pub batch_id: Option<BatchId>,

    pub outcome: DecisionOutcome,
    #[builder(default, setter(strip_option))]
    pub chosen_interpreter_id: Option<InterpreterId>,
    #[builder(default, setter(strip_option))]
    pub reason: Option<String>,

    /// Serialized `Vec<CandidateScore>`; kept as `Value` so the log schema
    /// does not churn when scoring components are added.
    #[builder(default = Value::Array(vec![]))]
    pub candidates: Value,

    pub policy_hash: String,
    pub mode: String,

    /// Wall-clock time the assignment procedure took for this booking, from
    /// candidate load through commit/defer/skip.
    #[builder(default = 0)]
    pub duration_ms: i64,

    #[builder(default = Utc::now())]
    pub decided_at: DateTime<Utc>,
}

impl AssignmentDecisionLog {
    pub fn with_candidates(mut self, candidates: &[CandidateScore]) -> Self {
        self.candidates = serde_json::to_value(candidates).unwrap_or(Value::Array(vec![]));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_candidates_serializes_scores() {
        let log = AssignmentDecisionLog::builder()
            .booking_id(BookingId::new())
            .outcome(DecisionOutcome::Committed)
            .policy_hash("deadbeef".to_string())
            .mode("normal".to_string())
            .build()
            .with_candidates(&[CandidateScore {
                interpreter_id: InterpreterId::new(),
                score: 0.91,
                fairness_component: 0.5,
                recency_component: 0.41,
                dr_component: 1.0,
                consecutive_dr_blocked: false,
            }]);
        assert!(log.candidates.is_array());
        assert_eq!(log.candidates.as_array().unwrap().len(), 1);
    }
}
