//! Booking entity and the enums that classify it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use typed_builder::TypedBuilder;

use super::ids::{BookingId, EnvironmentId, InterpreterId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_kind", rename_all = "snake_case")]
pub enum BookingKind {
    Interpreter,
    Room,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Waiting,
    Approve,
    Cancel,
}

/// Top-level meeting classification. DR meetings carry a [`DrType`]; `Other`
/// bookings may carry a free-text `other_type` label instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "meeting_type", rename_all = "snake_case")]
pub enum MeetingType {
    Dr,
    Vip,
    Weekly,
    General,
    Urgent,
    President,
    Other,
}

impl MeetingType {
    pub fn is_dr(&self) -> bool {
        matches!(self, MeetingType::Dr)
    }
}

/// DR meeting sub-types. `PrPr` is the legacy label, `DrPr` the newer one —
/// kept distinct; [`crate::kernel::config::Policy::dr_bucket_together`]
/// decides whether the fairness tracker buckets them as one DR stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "dr_type", rename_all = "snake_case")]
pub enum DrType {
    DrI,
    DrIi,
    DrK,
    DrPr,
    PrPr,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "auto_assign_status", rename_all = "snake_case")]
pub enum AutoAssignStatus {
    #[default]
    Pending,
    Processing,
    Done,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "pool_status", rename_all = "snake_case")]
pub enum PoolStatus {
    #[default]
    None,
    Waiting,
    Processing,
    Failed,
}

/// One requested interpreter booking.
///
/// Invariants (enforced across [`crate::store::Store`] writes, not by this
/// struct alone — see spec §3):
/// - `status = Approve` implies `interpreter_emp_code.is_some()`.
/// - no two `Approve` bookings sharing an `interpreter_emp_code` overlap.
/// - `auto_assign_locked_by.is_some() <=> auto_assign_status == Processing`.
/// - `time_start < time_end`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Booking {
    #[builder(default = BookingId::new())]
    pub id: BookingId,
    #[builder(default = BookingKind::Interpreter)]
    pub kind: BookingKind,
    #[builder(default)]
    pub status: BookingStatus,

    pub time_start: DateTime<Utc>,
    pub time_end: DateTime<Utc>,

    pub meeting_type: MeetingType,
    #[builder(default, setter(strip_option))]
    pub dr_type: Option<DrType>,
    #[builder(default, setter(strip_option))]
    pub other_type: Option<String>,
    pub owner_group: String,
    pub owner_emp_code: String,
    pub meeting_room: String,

    #[builder(default, setter(strip_option))]
    pub language_code: Option<String>,

    #[builder(default, setter(strip_option))]
    pub interpreter_emp_code: Option<InterpreterId>,
    #[builder(default, setter(strip_option))]
    pub selected_interpreter: Option<InterpreterId>,
    #[builder(default, setter(strip_option))]
    pub environment_id: Option<EnvironmentId>,

    #[builder(default, setter(strip_option))]
    pub auto_assign_at: Option<DateTime<Utc>>,
    #[builder(default)]
    pub auto_assign_status: AutoAssignStatus,
    #[builder(default, setter(strip_option))]
    pub auto_assign_locked_at: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub auto_assign_locked_by: Option<String>,
    #[builder(default = 0)]
    pub auto_assign_attempts: i32,

    #[builder(default)]
    pub pool_status: PoolStatus,
    #[builder(default, setter(strip_option))]
    pub pool_entry_time: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub decision_window_time: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub mode_at_enqueue: Option<String>,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn duration(&self) -> chrono::Duration {
        self.time_end - self.time_start
    }

    pub fn is_committed(&self) -> bool {
        self.status == BookingStatus::Approve && self.interpreter_emp_code.is_some()
    }

    /// Days between `now` and `time_start`, saturating at zero for bookings
    /// whose start has already passed.
    pub fn days_until_start(&self, now: DateTime<Utc>) -> f64 {
        let secs = (self.time_start - now).num_seconds().max(0) as f64;
        secs / 86_400.0
    }
}
