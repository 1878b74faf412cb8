//! Weighted candidate scoring and selection.

use chrono::{DateTime, Utc};

use crate::domain::{Booking, CandidateScore, Interpreter};
use crate::engine::fairness;
use crate::kernel::Policy;

/// Days since the interpreter's most recent booking before `as_of`,
/// normalized into 0..=1 via a 30-day saturation window — an interpreter
/// idle for a month or more scores the same as one idle for a year.
fn recency_score(history: &[Booking], as_of: DateTime<Utc>) -> f64 {
    let most_recent = history
        .iter()
        .filter(|b| b.time_start < as_of)
        .map(|b| b.time_start)
        .max();

    match most_recent {
        None => 1.0,
        Some(last) => {
            let days = (as_of - last).num_seconds().max(0) as f64 / 86_400.0;
            (days / 30.0).min(1.0)
        }
    }
}

fn language_match_score(interpreter: &Interpreter, candidate: &Booking) -> f64 {
    match &candidate.language_code {
        Some(code) if interpreter.supports_language(code) => 1.0,
        Some(_) => 0.0,
        None => 1.0,
    }
}

/// Small fixed nudge for the candidate the requester already named as
/// `selected_interpreter` — never a hard filter, just a tie-breaking bonus.
const SELECTED_INTERPRETER_BONUS: f64 = 0.1;

fn selected_interpreter_bonus(interpreter: &crate::domain::Interpreter, candidate: &Booking) -> f64 {
    if candidate.selected_interpreter == Some(interpreter.id) {
        SELECTED_INTERPRETER_BONUS
    } else {
        0.0
    }
}

fn visibility_spread_score(candidate: &Booking, history: &[Booking], roster_high_vis: &[usize]) -> f64 {
    if !matches!(
        candidate.meeting_type,
        crate::domain::MeetingType::Vip | crate::domain::MeetingType::President
    ) {
        return 1.0;
    }
    let own_count = history
        .iter()
        .filter(|b| {
            matches!(
                b.meeting_type,
                crate::domain::MeetingType::Vip | crate::domain::MeetingType::President
            )
        })
        .count();
    fairness::fairness_score(own_count, roster_high_vis)
}

/// Consecutive-DR component in `0..=1`: `1.0` when the candidate carries no
/// DR penalty at all, falling toward `0.0` as the streak-proportional
/// penalty (see [`fairness::dr_penalty_fraction`]) grows. Blocked candidates
/// still get a real (low) value here rather than a flat zero, so a fallback
/// selection can still rank them against one another.
fn dr_component(candidate: &Booking, history: &[Booking], policy: &Policy) -> f64 {
    if !candidate.meeting_type.is_dr() {
        return 1.0;
    }
    let suffix = fairness::consecutive_dr_count(history, candidate.time_start, policy);
    1.0 - fairness::dr_penalty_fraction(suffix, policy)
}

/// Scores one candidate interpreter for `candidate` against their booking
/// `history` and the roster-wide load distribution. The candidate's
/// `consecutive_dr_blocked` flag records whether the streak reached
/// `policy.consecutive_dr_limit`; blocking is a selection-tier concern (see
/// [`select_best`]), not a scoring one, so the returned score always
/// reflects the full weighted sum.
pub fn score_candidate(
    interpreter: &Interpreter,
    candidate: &Booking,
    history: &[Booking],
    roster_loads: &[usize],
    roster_high_vis: &[usize],
    policy: &Policy,
) -> CandidateScore {
    let blocked = fairness::is_dr_blocked(candidate, history, policy);

    let interpreter_load = fairness::load_count(history);
    let fairness_component = fairness::fairness_score(interpreter_load, roster_loads)
        * fairness::dynamic_pool_adjustment(interpreter_load, roster_loads);
    let recency_component = recency_score(history, candidate.time_start);
    let language_component = language_match_score(interpreter, candidate);
    let visibility_component = visibility_spread_score(candidate, history, roster_high_vis);
    let dr_component = dr_component(candidate, history, policy);

    let w = &policy.weights;
    let score = w.fairness_weight * fairness_component
        + w.recency_weight * recency_component
        + w.language_match_weight * language_component
        + w.visibility_spread_weight * visibility_component
        + w.dr_weight * dr_component
        + selected_interpreter_bonus(interpreter, candidate);

    CandidateScore {
        interpreter_id: interpreter.id,
        score,
        fairness_component,
        recency_component,
        dr_component,
        consecutive_dr_blocked: blocked,
    }
}

/// Picks the winning candidate: highest score above
/// `policy.min_acceptable_score`, ties broken by lowest interpreter id for
/// determinism. Returns `(winner, is_fallback)` — `is_fallback` is set when
/// every non-blocked candidate fell below `min_acceptable_score` (or none
/// existed) and the winner was instead drawn from the blocked set, so the
/// caller can annotate the decision log with the DR penalty that applied.
pub fn select_best(candidates: &[CandidateScore], policy: &Policy) -> Option<(CandidateScore, bool)> {
    let pick = |iter: &mut dyn Iterator<Item = &CandidateScore>| {
        iter.max_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.interpreter_id.cmp(&a.interpreter_id))
        })
        .cloned()
    };

    let primary = pick(&mut candidates
        .iter()
        .filter(|c| !c.consecutive_dr_blocked && c.score >= policy.min_acceptable_score));
    if let Some(winner) = primary {
        return Some((winner, false));
    }

    pick(&mut candidates.iter()).map(|winner| (winner, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookingKind, EnvironmentId, MeetingType};

    fn booking(lang: Option<&str>) -> Booking {
        let mut b = Booking::builder()
            .time_start(Utc::now())
            .time_end(Utc::now() + chrono::Duration::hours(1))
            .meeting_type(MeetingType::General)
            .owner_group("ops".to_string())
            .owner_emp_code("E1".to_string())
            .meeting_room("R1".to_string())
            .kind(BookingKind::Interpreter)
            .build();
        b.language_code = lang.map(|s| s.to_string());
        b
    }

    fn interpreter(langs: &[&str]) -> Interpreter {
        Interpreter::builder()
            .emp_code("E100".to_string())
            .display_name("Test".to_string())
            .languages(langs.iter().map(|s| s.to_string()).collect::<Vec<_>>())
            .environment_id(EnvironmentId::new())
            .build()
    }

    #[test]
    fn dr_blocked_candidate_is_flagged_but_not_zeroed() {
        let mut candidate = booking(None);
        candidate.meeting_type = MeetingType::Dr;
        candidate.dr_type = Some(crate::domain::DrType::DrI);

        let mut policy = Policy::default();
        policy.consecutive_dr_limit = 1;

        let history = vec![{
            let mut b = booking(None);
            b.meeting_type = MeetingType::Dr;
            b.dr_type = Some(crate::domain::DrType::DrI);
            b.time_start = candidate.time_start - chrono::Duration::hours(1);
            b
        }];

        let interp = interpreter(&["en"]);
        let scored = score_candidate(&interp, &candidate, &history, &[1], &[0], &policy);
        assert!(scored.consecutive_dr_blocked);
        assert!(scored.score > 0.0);
        assert!(scored.dr_component < 1.0);
    }

    #[test]
    fn language_mismatch_lowers_score_vs_match() {
        let policy = Policy::default();
        let candidate_en = booking(Some("en"));
        let interp_en = interpreter(&["en"]);
        let interp_fr = interpreter(&["fr"]);

        let with_match = score_candidate(&interp_en, &candidate_en, &[], &[0], &[0], &policy);
        let without_match = score_candidate(&interp_fr, &candidate_en, &[], &[0], &[0], &policy);
        assert!(with_match.score > without_match.score);
    }

    #[test]
    fn selected_interpreter_gets_a_small_bonus() {
        let policy = Policy::default();
        let interp = interpreter(&["en"]);
        let mut candidate = booking(None);
        candidate.selected_interpreter = Some(interp.id);

        let with_selection = score_candidate(&interp, &candidate, &[], &[0], &[0], &policy);

        let mut not_selected = candidate.clone();
        not_selected.selected_interpreter = Some(crate::domain::InterpreterId::new());
        let without_selection = score_candidate(&interp, &not_selected, &[], &[0], &[0], &policy);

        assert!(with_selection.score > without_selection.score);
    }

    #[test]
    fn select_best_breaks_ties_deterministically() {
        let policy = Policy::default();
        let a = CandidateScore {
            interpreter_id: crate::domain::InterpreterId::new(),
            score: 0.5,
            fairness_component: 0.0,
            recency_component: 0.0,
            dr_component: 1.0,
            consecutive_dr_blocked: false,
        };
        let mut b = a.clone();
        b.interpreter_id = crate::domain::InterpreterId::new();

        let (winner, is_fallback) = select_best(&[a.clone(), b.clone()], &policy).unwrap();
        let expected = if a.interpreter_id > b.interpreter_id { a } else { b };
        assert_eq!(winner.interpreter_id, expected.interpreter_id);
        assert!(!is_fallback);
    }

    #[test]
    fn select_best_falls_back_to_blocked_candidate_when_none_else_available() {
        let policy = Policy::default();
        let blocked = CandidateScore {
            interpreter_id: crate::domain::InterpreterId::new(),
            score: 0.3,
            fairness_component: 0.5,
            recency_component: 0.5,
            dr_component: 0.4,
            consecutive_dr_blocked: true,
        };

        let (winner, is_fallback) = select_best(&[blocked.clone()], &policy).unwrap();
        assert_eq!(winner.interpreter_id, blocked.interpreter_id);
        assert!(is_fallback);
    }

    #[test]
    fn select_best_returns_none_when_no_candidates_at_all() {
        let policy = Policy::default();
        assert!(select_best(&[], &policy).is_none());
    }
}
