//! `sqlx`/Postgres-backed [`Store`] implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{
    AssignmentDecisionLog, Booking, BookingId, Environment, EnvironmentId, Interpreter,
    InterpreterId,
};
use crate::kernel::{EngineError, EngineResult};

use super::Store;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get_booking(&self, id: BookingId) -> EngineResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(booking)
    }

    async fn save_booking(&self, booking: &Booking) -> EngineResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, kind, status, time_start, time_end, meeting_type, dr_type, other_type,
                owner_group, owner_emp_code, meeting_room, language_code,
                interpreter_emp_code, selected_interpreter, environment_id,
                auto_assign_at, auto_assign_status, auto_assign_locked_at, auto_assign_locked_by,
                auto_assign_attempts, pool_status, pool_entry_time, decision_window_time,
                mode_at_enqueue, created_at, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26
            )
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                interpreter_emp_code = EXCLUDED.interpreter_emp_code,
                selected_interpreter = EXCLUDED.selected_interpreter,
                auto_assign_at = EXCLUDED.auto_assign_at,
                auto_assign_status = EXCLUDED.auto_assign_status,
                auto_assign_locked_at = EXCLUDED.auto_assign_locked_at,
                auto_assign_locked_by = EXCLUDED.auto_assign_locked_by,
                auto_assign_attempts = EXCLUDED.auto_assign_attempts,
                pool_status = EXCLUDED.pool_status,
                pool_entry_time = EXCLUDED.pool_entry_time,
                decision_window_time = EXCLUDED.decision_window_time,
                mode_at_enqueue = EXCLUDED.mode_at_enqueue,
                updated_at = NOW()
            "#,
        )
        .bind(booking.id)
        .bind(booking.kind)
        .bind(booking.status)
        .bind(booking.time_start)
        .bind(booking.time_end)
        .bind(booking.meeting_type)
        .bind(booking.dr_type)
        .bind(&booking.other_type)
        .bind(&booking.owner_group)
        .bind(&booking.owner_emp_code)
        .bind(&booking.meeting_room)
        .bind(&booking.language_code)
        .bind(booking.interpreter_emp_code)
        .bind(booking.selected_interpreter)
        .bind(booking.environment_id)
        .bind(booking.auto_assign_at)
        .bind(booking.auto_assign_status)
        .bind(booking.auto_assign_locked_at)
        .bind(&booking.auto_assign_locked_by)
        .bind(booking.auto_assign_attempts)
        .bind(booking.pool_status)
        .bind(booking.pool_entry_time)
        .bind(booking.decision_window_time)
        .bind(&booking.mode_at_enqueue)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Single conditional `UPDATE` that re-runs the conflict check inside
    /// the write itself: the `NOT EXISTS` clause widens the overlap window
    /// by `buffer_minutes` on both sides, matching
    /// [`crate::engine::conflict::classify`]'s adjacency rule. If another
    /// transaction committed a conflicting booking to the same interpreter
    /// between this pass's candidate scoring and this write, `rows_affected`
    /// comes back zero and the caller gets `Conflict` instead of a silently
    /// applied double-booking.
    async fn commit_assignment(
        &self,
        booking: &Booking,
        interpreter_id: InterpreterId,
        buffer_minutes: i64,
    ) -> EngineResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = 'approve',
                interpreter_emp_code = $2,
                selected_interpreter = $2,
                auto_assign_status = 'done',
                auto_assign_locked_at = NULL,
                auto_assign_locked_by = NULL,
                pool_status = 'none',
                updated_at = NOW()
            WHERE id = $1
              AND NOT EXISTS (
                  SELECT 1 FROM bookings existing
                  WHERE existing.id <> $1
                    AND existing.interpreter_emp_code = $2
                    AND existing.status = 'approve'
                    AND existing.time_start < $4 + ($5 || ' minutes')::INTERVAL
                    AND existing.time_end + ($5 || ' minutes')::INTERVAL > $3
              )
            "#,
        )
        .bind(booking.id)
        .bind(interpreter_id)
        .bind(booking.time_start)
        .bind(booking.time_end)
        .bind(buffer_minutes.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            Ok(())
        } else {
            Err(EngineError::Conflict(interpreter_id))
        }
    }

    async fn bookings_for_interpreter_in_range(
        &self,
        interpreter_id: InterpreterId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> EngineResult<Vec<Booking>> {
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE interpreter_emp_code = $1
              AND status = 'approve'
              AND time_start < $3
              AND time_end > $2
            ORDER BY time_start ASC
            "#,
        )
        .bind(interpreter_id)
        .bind(window_start)
        .bind(window_end)
        .fetch_all(&self.pool)
        .await?;
        Ok(bookings)
    }

    async fn claim_due_bookings(
        &self,
        limit: i64,
        locked_by: &str,
        lease: chrono::Duration,
        now: DateTime<Utc>,
    ) -> EngineResult<Vec<Booking>> {
        let lease_ms = lease.num_milliseconds();
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            WITH due AS (
                SELECT id
                FROM bookings
                WHERE status = 'waiting'
                  AND (
                      (auto_assign_status = 'pending' AND auto_assign_at <= $4)
                      OR (auto_assign_status = 'processing' AND auto_assign_locked_at < $4 - ($2 || ' milliseconds')::INTERVAL)
                  )
                ORDER BY auto_assign_at ASC NULLS FIRST
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE bookings
            SET auto_assign_status = 'processing',
                auto_assign_locked_at = $4,
                auto_assign_locked_by = $3,
                auto_assign_attempts = auto_assign_attempts + 1,
                updated_at = $4
            WHERE id IN (SELECT id FROM due)
            RETURNING *
            "#,
        )
        .bind(limit)
        .bind(lease_ms.to_string())
        .bind(locked_by)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(bookings)
    }

    async fn claim_ready_pool_bookings(
        &self,
        limit: i64,
        locked_by: &str,
        lease: chrono::Duration,
        now: DateTime<Utc>,
    ) -> EngineResult<Vec<Booking>> {
        let lease_ms = lease.num_milliseconds();
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            WITH due AS (
                SELECT id
                FROM bookings
                WHERE pool_status = 'waiting'
                  AND decision_window_time <= $4
                ORDER BY decision_window_time ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE bookings
            SET pool_status = 'processing',
                auto_assign_locked_at = $4,
                auto_assign_locked_by = $3,
                updated_at = $4
            WHERE id IN (SELECT id FROM due)
            RETURNING *
            "#,
        )
        .bind(limit)
        .bind(lease_ms.to_string())
        .bind(locked_by)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(bookings)
    }

    async fn get_interpreter(&self, id: InterpreterId) -> EngineResult<Option<Interpreter>> {
        let interpreter =
            sqlx::query_as::<_, Interpreter>("SELECT * FROM interpreters WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(interpreter)
    }

    async fn interpreters_in_environment(
        &self,
        env_id: EnvironmentId,
    ) -> EngineResult<Vec<Interpreter>> {
        let interpreters = sqlx::query_as::<_, Interpreter>(
            "SELECT * FROM interpreters WHERE environment_id = $1 AND is_active = true",
        )
        .bind(env_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(interpreters)
    }

    async fn get_environment(&self, id: EnvironmentId) -> EngineResult<Option<Environment>> {
        let environment =
            sqlx::query_as::<_, Environment>("SELECT * FROM environments WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(environment)
    }

    async fn write_decision_log(&self, entry: &AssignmentDecisionLog) -> EngineResult<()> {
        sqlx::query(
            r#"
            INSERT INTO assignment_decision_logs (
                id, booking_id, batch_id, outcome, chosen_interpreter_id, reason,
                candidates, policy_hash, mode, duration_ms, decided_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(entry.id)
        .bind(entry.booking_id)
        .bind(entry.batch_id)
        .bind(entry.outcome)
        .bind(entry.chosen_interpreter_id)
        .bind(&entry.reason)
        .bind(&entry.candidates)
        .bind(&entry.policy_hash)
        .bind(&entry.mode)
        .bind(entry.duration_ms)
        .bind(entry.decided_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
