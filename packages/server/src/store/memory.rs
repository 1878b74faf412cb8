//! In-process [`Store`] backed by a mutex-guarded map, used by engine unit
//! tests so scoring/conflict/fairness logic can be exercised without a
//! database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    AssignmentDecisionLog, AutoAssignStatus, Booking, BookingId, BookingStatus, Environment,
    EnvironmentId, Interpreter, InterpreterId, PoolStatus,
};
use crate::engine::conflict;
use crate::kernel::{EngineError, EngineResult};

use super::Store;

#[derive(Default)]
pub struct MemoryStore {
    bookings: Mutex<HashMap<BookingId, Booking>>,
    interpreters: Mutex<HashMap<InterpreterId, Interpreter>>,
    environments: Mutex<HashMap<EnvironmentId, Environment>>,
    decision_logs: Mutex<Vec<AssignmentDecisionLog>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_booking(&self, booking: Booking) {
        self.bookings.lock().unwrap().insert(booking.id, booking);
    }

    pub fn seed_interpreter(&self, interpreter: Interpreter) {
        self.interpreters
            .lock()
            .unwrap()
            .insert(interpreter.id, interpreter);
    }

    pub fn seed_environment(&self, environment: Environment) {
        self.environments
            .lock()
            .unwrap()
            .insert(environment.id, environment);
    }

    pub fn decision_logs(&self) -> Vec<AssignmentDecisionLog> {
        self.decision_logs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_booking(&self, id: BookingId) -> EngineResult<Option<Booking>> {
        Ok(self.bookings.lock().unwrap().get(&id).cloned())
    }

    async fn save_booking(&self, booking: &Booking) -> EngineResult<()> {
        self.bookings
            .lock()
            .unwrap()
            .insert(booking.id, booking.clone());
        Ok(())
    }

    async fn commit_assignment(
        &self,
        booking: &Booking,
        interpreter_id: InterpreterId,
        buffer_minutes: i64,
    ) -> EngineResult<()> {
        let mut bookings = self.bookings.lock().unwrap();
        let conflicted = bookings.values().any(|existing| {
            existing.id != booking.id
                && existing.interpreter_emp_code == Some(interpreter_id)
                && existing.status == BookingStatus::Approve
                && conflict::classify(booking, existing, buffer_minutes) != conflict::ConflictKind::None
        });
        if conflicted {
            return Err(EngineError::Conflict(interpreter_id));
        }
        bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn bookings_for_interpreter_in_range(
        &self,
        interpreter_id: InterpreterId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> EngineResult<Vec<Booking>> {
        let bookings = self.bookings.lock().unwrap();
        Ok(bookings
            .values()
            .filter(|b| {
                b.interpreter_emp_code == Some(interpreter_id)
                    && b.status == BookingStatus::Approve
                    && b.time_start < window_end
                    && b.time_end > window_start
            })
            .cloned()
            .collect())
    }

    async fn claim_due_bookings(
        &self,
        limit: i64,
        locked_by: &str,
        _lease: chrono::Duration,
        now: DateTime<Utc>,
    ) -> EngineResult<Vec<Booking>> {
        let mut bookings = self.bookings.lock().unwrap();
        let mut due: Vec<BookingId> = bookings
            .values()
            .filter(|b| {
                b.status == BookingStatus::Waiting
                    && b.auto_assign_status == AutoAssignStatus::Pending
                    && b.auto_assign_at.map(|at| at <= now).unwrap_or(true)
            })
            .map(|b| b.id)
            .collect();
        due.sort();
        due.truncate(limit as usize);

        let mut claimed = Vec::with_capacity(due.len());
        for id in due {
            if let Some(b) = bookings.get_mut(&id) {
                b.auto_assign_status = AutoAssignStatus::Processing;
                b.auto_assign_locked_at = Some(now);
                b.auto_assign_locked_by = Some(locked_by.to_string());
                b.auto_assign_attempts += 1;
                claimed.push(b.clone());
            }
        }
        Ok(claimed)
    }

    async fn claim_ready_pool_bookings(
        &self,
        limit: i64,
        locked_by: &str,
        _lease: chrono::Duration,
        now: DateTime<Utc>,
    ) -> EngineResult<Vec<Booking>> {
        let mut bookings = self.bookings.lock().unwrap();
        let mut due: Vec<BookingId> = bookings
            .values()
            .filter(|b| {
                b.pool_status == PoolStatus::Waiting
                    && b.decision_window_time.map(|t| t <= now).unwrap_or(false)
            })
            .map(|b| b.id)
            .collect();
        due.sort();
        due.truncate(limit as usize);

        let mut claimed = Vec::with_capacity(due.len());
        for id in due {
            if let Some(b) = bookings.get_mut(&id) {
                b.pool_status = PoolStatus::Processing;
                b.auto_assign_locked_at = Some(now);
                b.auto_assign_locked_by = Some(locked_by.to_string());
                claimed.push(b.clone());
            }
        }
        Ok(claimed)
    }

    async fn get_interpreter(&self, id: InterpreterId) -> EngineResult<Option<Interpreter>> {
        Ok(self.interpreters.lock().unwrap().get(&id).cloned())
    }

    async fn interpreters_in_environment(
        &self,
        env_id: EnvironmentId,
    ) -> EngineResult<Vec<Interpreter>> {
        Ok(self
            .interpreters
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.environment_id == env_id && i.is_active)
            .cloned()
            .collect())
    }

    async fn get_environment(&self, id: EnvironmentId) -> EngineResult<Option<Environment>> {
        Ok(self.environments.lock().unwrap().get(&id).cloned())
    }

    async fn write_decision_log(&self, entry: &AssignmentDecisionLog) -> EngineResult<()> {
        self.decision_logs.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookingKind, MeetingType};

    fn booking() -> Booking {
        Booking::builder()
            .time_start(Utc::now())
            .time_end(Utc::now() + chrono::Duration::hours(1))
            .meeting_type(MeetingType::General)
            .owner_group("ops".to_string())
            .owner_emp_code("E1".to_string())
            .meeting_room("R1".to_string())
            .kind(BookingKind::Interpreter)
            .build()
    }

    #[tokio::test]
    async fn save_then_get_roundtrips() {
        let store = MemoryStore::new();
        let b = booking();
        store.save_booking(&b).await.unwrap();
        let fetched = store.get_booking(b.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, b.id);
    }

    #[tokio::test]
    async fn claim_due_bookings_transitions_to_processing() {
        let store = MemoryStore::new();
        let mut b = booking();
        b.auto_assign_at = Some(Utc::now() - chrono::Duration::minutes(1));
        store.save_booking(&b).await.unwrap();

        let claimed = store
            .claim_due_bookings(10, "worker-1", chrono::Duration::minutes(2), Utc::now())
            .await
            .unwrap();

        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].auto_assign_status, AutoAssignStatus::Processing);
    }
}
