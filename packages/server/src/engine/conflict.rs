//! Overlap classification between a candidate booking and an interpreter's
//! existing committed bookings.

use chrono::Duration;

use crate::domain::Booking;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// The two intervals share a non-empty overlap.
    Overlap,
    /// One interval fully contains the other.
    Contained,
    /// No overlap, but the gap is smaller than the configured buffer.
    Adjacent,
    /// No conflict at all.
    None,
}

/// Classifies how `candidate`'s interval relates to `existing`'s, given a
/// buffer (in minutes) that two bookings for the same interpreter must be
/// separated by.
pub fn classify(candidate: &Booking, existing: &Booking, buffer_minutes: i64) -> ConflictKind {
    let (cs, ce) = (candidate.time_start, candidate.time_end);
    let (es, ee) = (existing.time_start, existing.time_end);

    if cs < ee && es < ce {
        return if (cs <= es && ce >= ee) || (es <= cs && ee >= ce) {
            ConflictKind::Contained
        } else {
            ConflictKind::Overlap
        };
    }

    let buffer = Duration::minutes(buffer_minutes);
    let gap = if ce <= es { es - ce } else { cs - ee };
    if gap < buffer {
        ConflictKind::Adjacent
    } else {
        ConflictKind::None
    }
}

/// True if `candidate` conflicts (in any non-`None` way) with any booking in
/// `existing`.
pub fn has_conflict(candidate: &Booking, existing: &[Booking], buffer_minutes: i64) -> bool {
    existing
        .iter()
        .any(|b| classify(candidate, b, buffer_minutes) != ConflictKind::None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookingKind, MeetingType};
    use chrono::Utc;

    fn at(start_min: i64, end_min: i64) -> Booking {
        let base = Utc::now();
        Booking::builder()
            .time_start(base + Duration::minutes(start_min))
            .time_end(base + Duration::minutes(end_min))
            .meeting_type(MeetingType::General)
            .owner_group("ops".to_string())
            .owner_emp_code("E1".to_string())
            .meeting_room("R1".to_string())
            .kind(BookingKind::Interpreter)
            .build()
    }

    #[test]
    fn overlapping_intervals_are_overlap() {
        let a = at(0, 60);
        let b = at(30, 90);
        assert_eq!(classify(&a, &b, 15), ConflictKind::Overlap);
    }

    #[test]
    fn fully_nested_interval_is_contained() {
        let outer = at(0, 120);
        let inner = at(30, 60);
        assert_eq!(classify(&inner, &outer, 15), ConflictKind::Contained);
    }

    #[test]
    fn gap_smaller_than_buffer_is_adjacent() {
        let a = at(0, 60);
        let b = at(65, 120);
        assert_eq!(classify(&a, &b, 15), ConflictKind::Adjacent);
    }

    #[test]
    fn gap_larger_than_buffer_is_none() {
        let a = at(0, 60);
        let b = at(90, 120);
        assert_eq!(classify(&a, &b, 15), ConflictKind::None);
    }

    #[test]
    fn has_conflict_detects_any_matching_booking() {
        let candidate = at(30, 90);
        let existing = vec![at(200, 260), at(0, 60)];
        assert!(has_conflict(&candidate, &existing, 15));
    }
}
