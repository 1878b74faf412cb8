//! The assignment procedure: turns one claimed booking into a committed,
//! deferred, or skipped decision.
//!
//! Steps per booking:
//! 1. Load the booking's environment and candidate interpreter roster.
//! 2. Hard-filter the roster to interpreters supporting the requested
//!    language, if any.
//! 3. Build each candidate's recent booking history (fairness window).
//! 4. Drop candidates with a hard conflict against the booking's interval.
//! 5. Score the remaining candidates (fairness, recency, language, DR,
//!    spread).
//! 6. Select the winner: primary tier excludes DR-blocked/below-threshold
//!    candidates; a fallback tier picks from the full (including blocked)
//!    set if the primary tier is empty.
//! 7. Commit the winner via a conflict-checked write, retrying against the
//!    remaining candidates if another writer won the race.
//! 8. On no candidate at all: defer to the pool (applying backoff once this
//!    booking has already been through the pool once) if non-urgent, else
//!    mark `Skipped`.
//! 9. Emit an [`AssignmentDecisionLog`] regardless of outcome, stamped with
//!    the batch id and wall-clock duration of the whole procedure.

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use crate::domain::{
    AssignmentDecisionLog, AutoAssignStatus, BatchId, Booking, BookingStatus, CandidateScore,
    DecisionOutcome, MeetingType, PoolStatus,
};
use crate::engine::{conflict, fairness, scoring};
use crate::kernel::{EngineError, EngineResult, Policy};
use crate::store::Store;

pub struct Assigner<S: Store> {
    store: Arc<S>,
}

impl<S: Store> Clone for Assigner<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Store> Assigner<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Runs the full procedure for one claimed booking, returning the
    /// decision log entry produced (the caller is responsible for pushing
    /// it to the logging sink).
    pub async fn assign(
        &self,
        booking: Booking,
        policy: &Policy,
        batch_id: BatchId,
    ) -> EngineResult<AssignmentDecisionLog> {
        let start = std::time::Instant::now();
        let mut log = self.assign_inner(booking, policy, batch_id).await?;
        log.duration_ms = start.elapsed().as_millis() as i64;
        Ok(log)
    }

    async fn assign_inner(
        &self,
        mut booking: Booking,
        policy: &Policy,
        batch_id: BatchId,
    ) -> EngineResult<AssignmentDecisionLog> {
        let Some(environment_id) = booking.environment_id else {
            return self.skip(&mut booking, policy, batch_id, "booking has no environment scope").await;
        };

        let mut roster = self
            .store
            .interpreters_in_environment(environment_id)
            .await?;
        if roster.is_empty() {
            return self.skip(&mut booking, policy, batch_id, "no active interpreters in environment").await;
        }

        if let Some(lang) = &booking.language_code {
            roster.retain(|i| i.supports_language(lang));
            if roster.is_empty() {
                return self
                    .skip(&mut booking, policy, batch_id, "no interpreter in environment speaks the requested language")
                    .await;
            }
        }

        let window_start = booking.time_start - chrono::Duration::days(policy.fairness_window_days);
        let window_end = booking.time_start;

        let mut histories = Vec::with_capacity(roster.len());
        for interpreter in &roster {
            let history = self
                .store
                .bookings_for_interpreter_in_range(interpreter.id, window_start, window_end)
                .await?;
            histories.push(history);
        }

        let roster_loads: Vec<usize> = histories.iter().map(|h| fairness::load_count(h)).collect();
        let roster_high_vis: Vec<usize> = histories
            .iter()
            .map(|h| {
                h.iter()
                    .filter(|b| matches!(b.meeting_type, MeetingType::Vip | MeetingType::President))
                    .count()
            })
            .collect();

        let mut candidates: Vec<CandidateScore> = Vec::with_capacity(roster.len());
        for (interpreter, history) in roster.iter().zip(histories.iter()) {
            if conflict::has_conflict(&booking, history, policy.conflict_buffer_minutes) {
                continue;
            }
            candidates.push(scoring::score_candidate(
                interpreter,
                &booking,
                history,
                &roster_loads,
                &roster_high_vis,
                policy,
            ));
        }

        self.select_and_commit(&mut booking, policy, batch_id, candidates).await
    }

    /// Repeatedly selects the best remaining candidate and attempts to
    /// commit it, retrying against the rest of the pool on a commit
    /// conflict (another writer won the race for that interpreter) up to
    /// once per candidate.
    async fn select_and_commit(
        &self,
        booking: &mut Booking,
        policy: &Policy,
        batch_id: BatchId,
        mut candidates: Vec<CandidateScore>,
    ) -> EngineResult<AssignmentDecisionLog> {
        let all_candidates = candidates.clone();
        let max_retries = candidates.len();

        for _ in 0..=max_retries {
            let Some((winner, is_fallback)) = scoring::select_best(&candidates, policy) else {
                break;
            };

            match self
                .store
                .commit_assignment(booking, winner.interpreter_id, policy.conflict_buffer_minutes)
                .await
            {
                Ok(()) => {
                    booking.status = BookingStatus::Approve;
                    booking.interpreter_emp_code = Some(winner.interpreter_id);
                    booking.selected_interpreter = Some(winner.interpreter_id);
                    booking.auto_assign_status = AutoAssignStatus::Done;
                    booking.auto_assign_locked_at = None;
                    booking.auto_assign_locked_by = None;
                    booking.pool_status = PoolStatus::None;

                    if is_fallback {
                        return Ok(AssignmentDecisionLog::builder()
                            .booking_id(booking.id)
                            .batch_id(batch_id)
                            .outcome(DecisionOutcome::Committed)
                            .chosen_interpreter_id(winner.interpreter_id)
                            .reason(format!(
                                "fallback tier: consecutive-DR penalty applied (dr_component={:.3})",
                                winner.dr_component
                            ))
                            .policy_hash(policy.hash())
                            .mode(format!("{:?}", policy.mode))
                            .build()
                            .with_candidates(&all_candidates));
                    }
                    return Ok(AssignmentDecisionLog::builder()
                        .booking_id(booking.id)
                        .batch_id(batch_id)
                        .outcome(DecisionOutcome::Committed)
                        .chosen_interpreter_id(winner.interpreter_id)
                        .policy_hash(policy.hash())
                        .mode(format!("{:?}", policy.mode))
                        .build()
                        .with_candidates(&all_candidates));
                }
                Err(EngineError::Conflict(_)) => {
                    warn!(
                        booking_id = %booking.id,
                        interpreter_id = %winner.interpreter_id,
                        "commit conflict, retrying against remaining candidates"
                    );
                    candidates.retain(|c| c.interpreter_id != winner.interpreter_id);
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        if is_deferrable(booking) {
            self.defer(booking, policy, batch_id, &all_candidates).await
        } else {
            self.skip_with_candidates(
                booking,
                policy,
                batch_id,
                "no eligible candidate and booking is not deferrable",
                &all_candidates,
            )
            .await
        }
    }

    async fn defer(
        &self,
        booking: &mut Booking,
        policy: &Policy,
        batch_id: BatchId,
        candidates: &[CandidateScore],
    ) -> EngineResult<AssignmentDecisionLog> {
        let now = Utc::now();

        if booking.pool_entry_time.is_some() {
            booking.auto_assign_attempts += 1;
            if booking.auto_assign_attempts as u32 >= policy.max_auto_assign_attempts {
                booking.pool_status = PoolStatus::Failed;
                booking.auto_assign_status = AutoAssignStatus::Skipped;
                booking.auto_assign_locked_at = None;
                booking.auto_assign_locked_by = None;
                self.store.save_booking(booking).await?;

                return Ok(AssignmentDecisionLog::builder()
                    .booking_id(booking.id)
                    .batch_id(batch_id)
                    .outcome(DecisionOutcome::Failed)
                    .reason(format!(
                        "no eligible candidate after {} attempts, surfaced for manual handling",
                        booking.auto_assign_attempts
                    ))
                    .policy_hash(policy.hash())
                    .mode(format!("{:?}", policy.mode))
                    .build()
                    .with_candidates(candidates));
            }

            let backoff_exp = (booking.auto_assign_attempts - 1).max(0) as u32;
            let backoff_minutes = policy
                .backoff_base_minutes
                .saturating_mul(1i64 << backoff_exp.min(20))
                .min(policy.max_backoff_minutes);
            booking.pool_status = PoolStatus::Waiting;
            booking.decision_window_time = Some(now + chrono::Duration::minutes(backoff_minutes));
        } else {
            booking.pool_status = PoolStatus::Waiting;
            booking.pool_entry_time = Some(now);
            booking.decision_window_time =
                Some(crate::pool::readiness::compute_decision_window(booking, policy, now));
        }

        booking.mode_at_enqueue = Some(format!("{:?}", policy.mode));
        booking.auto_assign_status = AutoAssignStatus::Pending;
        booking.auto_assign_locked_at = None;
        booking.auto_assign_locked_by = None;
        self.store.save_booking(booking).await?;

        Ok(AssignmentDecisionLog::builder()
            .booking_id(booking.id)
            .batch_id(batch_id)
            .outcome(DecisionOutcome::Deferred)
            .reason("no eligible candidate at this pass, deferred to pool".to_string())
            .policy_hash(policy.hash())
            .mode(format!("{:?}", policy.mode))
            .build()
            .with_candidates(candidates))
    }

    async fn skip(
        &self,
        booking: &mut Booking,
        policy: &Policy,
        batch_id: BatchId,
        reason: &str,
    ) -> EngineResult<AssignmentDecisionLog> {
        self.skip_with_candidates(booking, policy, batch_id, reason, &[]).await
    }

    async fn skip_with_candidates(
        &self,
        booking: &mut Booking,
        policy: &Policy,
        batch_id: BatchId,
        reason: &str,
        candidates: &[CandidateScore],
    ) -> EngineResult<AssignmentDecisionLog> {
        booking.auto_assign_status = AutoAssignStatus::Skipped;
        booking.auto_assign_locked_at = None;
        booking.auto_assign_locked_by = None;
        self.store.save_booking(booking).await?;

        Ok(AssignmentDecisionLog::builder()
            .booking_id(booking.id)
            .batch_id(batch_id)
            .outcome(DecisionOutcome::Skipped)
            .reason(reason.to_string())
            .policy_hash(policy.hash())
            .mode(format!("{:?}", policy.mode))
            .build()
            .with_candidates(candidates))
    }
}

/// Urgent and President-level meetings must be decided immediately; every
/// other meeting type may wait in the pool for a later pass.
fn is_deferrable(booking: &Booking) -> bool {
    !matches!(
        booking.meeting_type,
        MeetingType::Urgent | MeetingType::President
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookingKind, Environment, Interpreter};
    use crate::store::memory::MemoryStore;

    fn base_booking(meeting_type: MeetingType, env_id: crate::domain::EnvironmentId) -> Booking {
        Booking::builder()
            .time_start(Utc::now() + chrono::Duration::hours(2))
            .time_end(Utc::now() + chrono::Duration::hours(3))
            .meeting_type(meeting_type)
            .owner_group("ops".to_string())
            .owner_emp_code("E1".to_string())
            .meeting_room("R1".to_string())
            .kind(BookingKind::Interpreter)
            .environment_id(env_id)
            .build()
    }

    #[tokio::test]
    async fn commits_when_a_candidate_is_available() {
        let store = Arc::new(MemoryStore::new());
        let env = Environment::builder().name("HQ".to_string()).build();
        let interp = Interpreter::builder()
            .emp_code("E100".to_string())
            .display_name("A".to_string())
            .environment_id(env.id)
            .build();
        store.seed_environment(env.clone());
        store.seed_interpreter(interp.clone());

        let booking = base_booking(MeetingType::General, env.id);
        let assigner = Assigner::new(store.clone());
        let policy = Policy::default();
        let log = assigner
            .assign(booking.clone(), &policy, BatchId::new())
            .await
            .unwrap();

        assert_eq!(log.outcome, DecisionOutcome::Committed);
        let saved = store.get_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(saved.status, BookingStatus::Approve);
        assert_eq!(saved.interpreter_emp_code, Some(interp.id));
    }

    #[tokio::test]
    async fn defers_general_meeting_with_no_candidates() {
        let store = Arc::new(MemoryStore::new());
        let env = Environment::builder().name("HQ".to_string()).build();
        store.seed_environment(env.clone());

        let booking = base_booking(MeetingType::General, env.id);
        let assigner = Assigner::new(store.clone());
        let policy = Policy::default();
        let log = assigner
            .assign(booking.clone(), &policy, BatchId::new())
            .await
            .unwrap();

        assert_eq!(log.outcome, DecisionOutcome::Deferred);
        let saved = store.get_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(saved.pool_status, PoolStatus::Waiting);
    }

    #[tokio::test]
    async fn skips_urgent_meeting_with_no_candidates_instead_of_deferring() {
        let store = Arc::new(MemoryStore::new());
        let env = Environment::builder().name("HQ".to_string()).build();
        store.seed_environment(env.clone());

        let booking = base_booking(MeetingType::Urgent, env.id);
        let assigner = Assigner::new(store.clone());
        let policy = Policy::default();
        let log = assigner
            .assign(booking.clone(), &policy, BatchId::new())
            .await
            .unwrap();

        assert_eq!(log.outcome, DecisionOutcome::Skipped);
        let saved = store.get_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(saved.auto_assign_status, AutoAssignStatus::Skipped);
    }

    #[tokio::test]
    async fn skips_when_requested_language_has_no_speaker_in_roster() {
        let store = Arc::new(MemoryStore::new());
        let env = Environment::builder().name("HQ".to_string()).build();
        let interp = Interpreter::builder()
            .emp_code("E100".to_string())
            .display_name("A".to_string())
            .environment_id(env.id)
            .languages(vec!["en".to_string()])
            .build();
        store.seed_environment(env.clone());
        store.seed_interpreter(interp);

        let mut booking = base_booking(MeetingType::General, env.id);
        booking.language_code = Some("fr".to_string());
        let assigner = Assigner::new(store.clone());
        let policy = Policy::default();
        let log = assigner
            .assign(booking.clone(), &policy, BatchId::new())
            .await
            .unwrap();

        assert_eq!(log.outcome, DecisionOutcome::Deferred);
        let saved = store.get_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(saved.status, BookingStatus::Waiting);
    }

    #[tokio::test]
    async fn deferred_booking_past_max_attempts_fails_instead_of_retrying_forever() {
        let store = Arc::new(MemoryStore::new());
        let env = Environment::builder().name("HQ".to_string()).build();
        let interp = Interpreter::builder()
            .emp_code("E100".to_string())
            .display_name("A".to_string())
            .environment_id(env.id)
            .build();
        store.seed_environment(env.clone());
        store.seed_interpreter(interp.clone());

        let mut booking = base_booking(MeetingType::General, env.id);
        // an already-approved booking for the only interpreter, overlapping
        // the candidate's interval, so conflict filtering leaves zero
        // candidates and the defer path runs.
        let mut blocker = base_booking(MeetingType::General, env.id);
        blocker.status = BookingStatus::Approve;
        blocker.interpreter_emp_code = Some(interp.id);
        store.seed_booking(blocker);

        booking.pool_entry_time = Some(Utc::now() - chrono::Duration::days(1));
        booking.pool_status = PoolStatus::Processing;

        let mut policy = Policy::default();
        policy.max_auto_assign_attempts = 1;
        booking.auto_assign_attempts = 1;

        let assigner = Assigner::new(store.clone());
        let log = assigner
            .assign(booking.clone(), &policy, BatchId::new())
            .await
            .unwrap();

        assert_eq!(log.outcome, DecisionOutcome::Failed);
        let saved = store.get_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(saved.pool_status, PoolStatus::Failed);
    }
}
