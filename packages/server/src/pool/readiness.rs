//! Decision-window computation for the deferred booking pool.

use chrono::{DateTime, Duration, Utc};

use crate::domain::{Booking, MeetingType, PoolStatus};
use crate::kernel::{Mode, Policy};

/// Whether a booking currently sitting in the pool has crossed its decision
/// window and must be picked up by the next pool-sweep pass.
pub fn is_ready(booking: &Booking, now: DateTime<Utc>) -> bool {
    booking.pool_status == PoolStatus::Waiting
        && booking
            .decision_window_time
            .map(|t| t <= now)
            .unwrap_or(false)
}

/// How long before `timeStart` the decision window opens, per the policy's
/// mode and the booking's urgency class (days-until-start at or below
/// `policy.urgent_threshold_days`, independent of `MeetingType::Urgent`
/// which always bypasses the pool entirely).
fn readiness_duration(booking: &Booking, policy: &Policy, now: DateTime<Utc>) -> Duration {
    let is_urgent_class = booking.days_until_start(now) <= policy.urgent_threshold_days;
    let general = Duration::minutes((policy.general_threshold_days * 24.0 * 60.0).round() as i64);

    match policy.mode {
        Mode::Urgent => Duration::hours(1),
        Mode::Normal => {
            if is_urgent_class {
                Duration::hours(4)
            } else {
                policy.decision_window_for(booking.meeting_type)
            }
        }
        Mode::Balance => {
            if is_urgent_class {
                Duration::hours(12)
            } else {
                general
            }
        }
        Mode::Custom => policy.decision_window_for(booking.meeting_type),
    }
}

/// Computes the decision window deadline for a booking entering the pool
/// right now: `max(now, timeStart - readiness)`.
pub fn compute_decision_window(booking: &Booking, policy: &Policy, now: DateTime<Utc>) -> DateTime<Utc> {
    let readiness = readiness_duration(booking, policy, now);
    (booking.time_start - readiness).max(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BookingKind;

    fn pooled_booking(decision_window: Option<DateTime<Utc>>) -> Booking {
        let mut b = Booking::builder()
            .time_start(Utc::now() + chrono::Duration::hours(6))
            .time_end(Utc::now() + chrono::Duration::hours(7))
            .meeting_type(MeetingType::General)
            .owner_group("ops".to_string())
            .owner_emp_code("E1".to_string())
            .meeting_room("R1".to_string())
            .kind(BookingKind::Interpreter)
            .build();
        b.pool_status = PoolStatus::Waiting;
        b.decision_window_time = decision_window;
        b
    }

    #[test]
    fn not_ready_before_decision_window() {
        let booking = pooled_booking(Some(Utc::now() + chrono::Duration::hours(1)));
        assert!(!is_ready(&booking, Utc::now()));
    }

    #[test]
    fn ready_once_decision_window_elapses() {
        let booking = pooled_booking(Some(Utc::now() - chrono::Duration::minutes(1)));
        assert!(is_ready(&booking, Utc::now()));
    }

    #[test]
    fn balance_mode_general_booking_windows_off_general_threshold() {
        let mut policy = Policy::default();
        policy.mode = Mode::Balance;
        policy.general_threshold_days = 14.0;

        let now = Utc::now();
        let mut booking = pooled_booking(None);
        booking.time_start = now + Duration::days(30);
        booking.time_end = booking.time_start + Duration::hours(1);

        let deadline = compute_decision_window(&booking, &policy, now);
        assert_eq!(deadline, booking.time_start - Duration::days(14));
    }

    #[test]
    fn urgent_mode_always_uses_a_one_hour_window() {
        let mut policy = Policy::default();
        policy.mode = Mode::Urgent;

        let now = Utc::now();
        let mut booking = pooled_booking(None);
        booking.time_start = now + Duration::days(10);
        booking.time_end = booking.time_start + Duration::hours(1);

        let deadline = compute_decision_window(&booking, &policy, now);
        assert_eq!(deadline, booking.time_start - Duration::hours(1));
    }

    #[test]
    fn decision_window_never_lands_before_now() {
        let policy = Policy::default();
        let now = Utc::now();
        let mut booking = pooled_booking(None);
        booking.time_start = now + Duration::minutes(30);
        booking.time_end = booking.time_start + Duration::hours(1);

        let deadline = compute_decision_window(&booking, &policy, now);
        assert!(deadline >= now);
    }
}
