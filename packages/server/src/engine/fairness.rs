//! Workload fairness and consecutive-DR tracking.
//!
//! Both trackers operate on a slice of an interpreter's already-committed
//! bookings (fetched by the caller via
//! [`crate::store::Store::bookings_for_interpreter_in_range`]) so the
//! scoring and conflict stages share one round-trip to storage.

use chrono::{DateTime, Utc};

use crate::domain::{Booking, DrType};
use crate::kernel::Policy;

/// Raw assignment count for one interpreter within the fairness rolling
/// window, used as the denominator for the fairness score component.
pub fn load_count(bookings: &[Booking]) -> usize {
    bookings.len()
}

/// A 0..=1 fairness score: 1.0 means this interpreter has the lowest load of
/// the roster, 0.0 means the highest. Interpreters with equal load all get
/// the same score.
pub fn fairness_score(interpreter_load: usize, roster_loads: &[usize]) -> f64 {
    if roster_loads.is_empty() {
        return 1.0;
    }
    let min = *roster_loads.iter().min().unwrap();
    let max = *roster_loads.iter().max().unwrap();
    if max == min {
        return 1.0;
    }
    1.0 - (interpreter_load.saturating_sub(min) as f64 / (max - min) as f64)
}

/// Adjustment multiplier for an interpreter with zero assignment history in
/// the fairness window (a newly active or newly rostered interpreter), so a
/// roster expansion doesn't instantly front-load every open slot onto the
/// newcomer by virtue of their fairness score otherwise being a flat 1.0.
pub fn dynamic_pool_adjustment(interpreter_load: usize, roster_loads: &[usize]) -> f64 {
    if interpreter_load != 0 {
        return 1.0;
    }
    let new_count = roster_loads.iter().filter(|&&l| l == 0).count();
    let existing_count = roster_loads.len().saturating_sub(new_count);
    1.0 + (new_count as f64 / existing_count.max(1) as f64)
}

/// Fraction in `0..=1` by which a DR candidate's score is penalized for a
/// consecutive-DR streak that hasn't yet reached the block threshold.
/// Proportional to `suffix * dr_consecutive_penalty_hours`, normalized
/// against a 24h span so a handful of penalty-hours reads as a partial
/// rather than total deduction.
pub fn dr_penalty_fraction(suffix: u32, policy: &Policy) -> f64 {
    (suffix as f64 * policy.dr_consecutive_penalty_hours / 24.0).min(1.0)
}

fn dr_bucket(booking: &Booking, bucket_together: bool) -> Option<&'static str> {
    if !booking.meeting_type.is_dr() {
        return None;
    }
    match booking.dr_type {
        Some(DrType::PrPr) | Some(DrType::DrPr) if bucket_together => Some("dr_pr"),
        Some(DrType::PrPr) => Some("pr_pr"),
        Some(DrType::DrPr) => Some("dr_pr"),
        Some(_) => Some("dr_other"),
        None => Some("dr_other"),
    }
}

/// Counts how many DR bookings immediately precede `as_of` in `history`
/// (sorted or not; this function sorts internally) with no non-DR booking
/// breaking the streak.
pub fn consecutive_dr_count(history: &[Booking], as_of: DateTime<Utc>, policy: &Policy) -> u32 {
    let mut sorted: Vec<&Booking> = history.iter().filter(|b| b.time_start < as_of).collect();
    sorted.sort_by_key(|b| std::cmp::Reverse(b.time_start));

    let mut count = 0u32;
    for b in sorted {
        if dr_bucket(b, policy.dr_bucket_together).is_some() {
            count += 1;
        } else {
            break;
        }
    }
    count
}

/// True if assigning this DR booking would push the interpreter past
/// `policy.consecutive_dr_limit`.
pub fn is_dr_blocked(candidate: &Booking, history: &[Booking], policy: &Policy) -> bool {
    if !candidate.meeting_type.is_dr() {
        return false;
    }
    consecutive_dr_count(history, candidate.time_start, policy) >= policy.consecutive_dr_limit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookingKind, MeetingType};
    use chrono::Duration;

    fn dr_at(hours_ago: i64) -> Booking {
        let now = Utc::now();
        Booking::builder()
            .time_start(now - Duration::hours(hours_ago))
            .time_end(now - Duration::hours(hours_ago) + Duration::hours(1))
            .meeting_type(MeetingType::Dr)
            .dr_type(DrType::DrI)
            .owner_group("ops".to_string())
            .owner_emp_code("E1".to_string())
            .meeting_room("R1".to_string())
            .kind(BookingKind::Interpreter)
            .build()
    }

    #[test]
    fn fairness_score_is_one_when_loads_equal() {
        assert_eq!(fairness_score(3, &[3, 3, 3]), 1.0);
    }

    #[test]
    fn fairness_score_favors_lower_load() {
        let low = fairness_score(1, &[1, 5]);
        let high = fairness_score(5, &[1, 5]);
        assert!(low > high);
    }

    #[test]
    fn consecutive_dr_count_stops_at_non_dr_booking() {
        let history = vec![dr_at(1), dr_at(2)];
        let policy = Policy::default();
        let count = consecutive_dr_count(&history, Utc::now(), &policy);
        assert_eq!(count, 2);
    }

    #[test]
    fn is_dr_blocked_true_once_limit_reached() {
        let mut policy = Policy::default();
        policy.consecutive_dr_limit = 2;
        let history = vec![dr_at(1), dr_at(2)];
        let candidate = dr_at(0);
        assert!(is_dr_blocked(&candidate, &history, &policy));
    }

    #[test]
    fn non_dr_candidate_is_never_blocked() {
        let policy = Policy::default();
        let mut candidate = dr_at(0);
        candidate.meeting_type = MeetingType::General;
        candidate.dr_type = None;
        assert!(!is_dr_blocked(&candidate, &[dr_at(1), dr_at(2)], &policy));
    }

    #[test]
    fn dynamic_pool_adjustment_is_neutral_for_loaded_interpreters() {
        assert_eq!(dynamic_pool_adjustment(3, &[3, 0, 0]), 1.0);
    }

    #[test]
    fn dynamic_pool_adjustment_boosts_newcomers_proportionally() {
        // two brand-new interpreters (load 0) alongside one established one.
        let adjustment = dynamic_pool_adjustment(0, &[0, 0, 5]);
        assert_eq!(adjustment, 1.0 + (2.0 / 1.0));
    }

    #[test]
    fn dr_penalty_fraction_grows_with_suffix_and_caps_at_one() {
        let mut policy = Policy::default();
        policy.dr_consecutive_penalty_hours = 12.0;
        assert_eq!(dr_penalty_fraction(0, &policy), 0.0);
        assert_eq!(dr_penalty_fraction(1, &policy), 0.5);
        assert_eq!(dr_penalty_fraction(4, &policy), 1.0);
    }
}
