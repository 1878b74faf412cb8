//! Persistence abstraction: the engine talks only to [`Store`], never to
//! `sqlx` directly, so scheduling logic can be exercised against
//! [`memory::MemoryStore`] in unit tests and against [`postgres::PgStore`]
//! in integration tests and production.

pub mod memory;
pub mod postgres;
pub mod sql;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{AssignmentDecisionLog, Booking, BookingId, Environment, EnvironmentId, Interpreter, InterpreterId};
use crate::kernel::EngineResult;

/// Abstract persistence contract for the scheduling engine.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_booking(&self, id: BookingId) -> EngineResult<Option<Booking>>;
    async fn save_booking(&self, booking: &Booking) -> EngineResult<()>;

    /// Commits `booking` to `interpreter_id`, re-running the conflict check
    /// against whatever is now `Approve`-committed for that interpreter
    /// before writing. Returns `Err(EngineError::Conflict)` rather than
    /// applying the write if another writer has since committed an
    /// overlapping booking to the same interpreter — distinct from
    /// [`Store::save_booking`], which performs no such check and is used for
    /// non-committing transitions (defer, skip).
    async fn commit_assignment(
        &self,
        booking: &Booking,
        interpreter_id: InterpreterId,
        buffer_minutes: i64,
    ) -> EngineResult<()>;

    /// All `Approve` bookings for `interpreter_id` whose interval overlaps
    /// `[window_start, window_end)`, used for conflict detection and
    /// fairness/consecutive-DR lookback.
    async fn bookings_for_interpreter_in_range(
        &self,
        interpreter_id: InterpreterId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> EngineResult<Vec<Booking>>;

    /// Claims up to `limit` bookings that are due for an auto-assign pass,
    /// atomically transitioning them to `Processing` and locking them to
    /// `locked_by`. Also reclaims bookings whose lock has expired.
    async fn claim_due_bookings(
        &self,
        limit: i64,
        locked_by: &str,
        lease: chrono::Duration,
        now: DateTime<Utc>,
    ) -> EngineResult<Vec<Booking>>;

    /// Claims bookings sitting in the deferred pool whose decision window
    /// has elapsed.
    async fn claim_ready_pool_bookings(
        &self,
        limit: i64,
        locked_by: &str,
        lease: chrono::Duration,
        now: DateTime<Utc>,
    ) -> EngineResult<Vec<Booking>>;

    async fn get_interpreter(&self, id: InterpreterId) -> EngineResult<Option<Interpreter>>;
    async fn interpreters_in_environment(&self, env_id: EnvironmentId) -> EngineResult<Vec<Interpreter>>;
    async fn get_environment(&self, id: EnvironmentId) -> EngineResult<Option<Environment>>;

    async fn write_decision_log(&self, entry: &AssignmentDecisionLog) -> EngineResult<()>;
}
