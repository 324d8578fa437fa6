//! Session scoring: net score, pass verdict and star tier.
//!
//! The pass threshold and the star bands are deliberately independent. A
//! failing score of 6 still earns one star, and 9 is where both passing and the
//! top tier begin.

use serde::{Deserialize, Serialize};

use crate::model::MAX_STARS;

/// Net score a session must exceed to pass.
pub const PASS_THRESHOLD: i32 = 8;

//
// ─── INPUT / OUTPUT ────────────────────────────────────────────────────────────
//

/// One answered question as the scorer sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerEvent {
    pub is_correct: bool,
}

impl AnswerEvent {
    #[must_use]
    pub fn correct() -> Self {
        Self { is_correct: true }
    }

    #[must_use]
    pub fn incorrect() -> Self {
        Self { is_correct: false }
    }
}

/// Result of scoring a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: i32,
    pub passed: bool,
    pub stars_earned: u8,
}

//
// ─── SCORING ───────────────────────────────────────────────────────────────────
//

/// Score a session: `correct answers - hints used`.
///
/// ```
/// # use quest_core::scoring::{evaluate_session, AnswerEvent};
/// let mut answers = vec![AnswerEvent::correct(); 9];
/// answers.push(AnswerEvent::incorrect());
///
/// let eval = evaluate_session(&answers, 0);
/// assert_eq!(eval.score, 9);
/// assert!(eval.passed);
/// assert_eq!(eval.stars_earned, 3);
///
/// let eval = evaluate_session(&answers, 1);
/// assert_eq!(eval.score, 8);
/// assert!(!eval.passed);
/// assert_eq!(eval.stars_earned, 2);
/// ```
#[must_use]
pub fn evaluate_session(answers: &[AnswerEvent], hints_used: u32) -> Evaluation {
    let correct = answers.iter().filter(|a| a.is_correct).count();
    let correct = i32::try_from(correct).unwrap_or(i32::MAX);
    let hints = i32::try_from(hints_used).unwrap_or(i32::MAX);
    let score = correct.saturating_sub(hints);

    Evaluation {
        score,
        passed: is_passing(score),
        stars_earned: stars_for_score(score),
    }
}

/// Strictly greater than [`PASS_THRESHOLD`].
#[must_use]
pub fn is_passing(score: i32) -> bool {
    score > PASS_THRESHOLD
}

/// Star tier for a net score: <5 → 0, 5–6 → 1, 7–8 → 2, ≥9 → 3.
#[must_use]
pub fn stars_for_score(score: i32) -> u8 {
    match score {
        i32::MIN..=4 => 0,
        5..=6 => 1,
        7..=8 => 2,
        _ => MAX_STARS,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn answers(correct: usize, total: usize) -> Vec<AnswerEvent> {
        (0..total)
            .map(|i| AnswerEvent { is_correct: i < correct })
            .collect()
    }

    #[test]
    fn boundary_table() {
        let cases: [(i32, u8, bool); 8] = [
            (4, 0, false),
            (5, 1, false),
            (6, 1, false),
            (7, 2, false),
            (8, 2, false),
            (9, 3, true),
            (10, 3, true),
            (-2, 0, false),
        ];
        for (score, stars, passed) in cases {
            assert_eq!(stars_for_score(score), stars, "stars for {score}");
            assert_eq!(is_passing(score), passed, "pass for {score}");
        }
    }

    #[test]
    fn hints_subtract_from_correct_count() {
        let eval = evaluate_session(&answers(10, 10), 1);
        assert_eq!(eval.score, 9);
        assert!(eval.passed);
        assert_eq!(eval.stars_earned, 3);
    }

    #[test]
    fn failing_score_still_earns_a_star() {
        let eval = evaluate_session(&answers(6, 10), 0);
        assert_eq!(eval.score, 6);
        assert!(!eval.passed);
        assert_eq!(eval.stars_earned, 1);
    }

    #[test]
    fn score_can_go_negative() {
        let eval = evaluate_session(&answers(1, 10), 3);
        assert_eq!(eval.score, -2);
        assert!(!eval.passed);
        assert_eq!(eval.stars_earned, 0);
    }

    #[test]
    fn empty_session_scores_zero() {
        let eval = evaluate_session(&[], 0);
        assert_eq!(
            eval,
            Evaluation {
                score: 0,
                passed: false,
                stars_earned: 0
            }
        );
    }

    proptest! {
        #[test]
        fn stars_and_pass_are_consistent(correct in 0usize..=10, hints in 0u32..=10) {
            let eval = evaluate_session(&answers(correct, 10), hints);
            prop_assert!(eval.stars_earned <= MAX_STARS);
            prop_assert_eq!(eval.passed, eval.stars_earned == MAX_STARS);
            let expected = i32::try_from(correct).unwrap() - i32::try_from(hints).unwrap();
            prop_assert_eq!(eval.score, expected);
        }

        #[test]
        fn stars_never_drop_as_score_rises(score in -20i32..20) {
            prop_assert!(stars_for_score(score) <= stars_for_score(score + 1));
        }
    }
}
