use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{MAX_STARS, SubRoundRef};
use crate::scoring::{Evaluation, is_passing, stars_for_score};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("stars earned ({stars}) exceed {MAX_STARS}")]
    StarsOutOfRange { stars: u8 },

    #[error("stored verdict does not match score {score}")]
    VerdictMismatch { score: i32 },

    #[error("hints used ({hints}) exceed question count ({total})")]
    TooManyHints { hints: u32, total: u32 },
}

/// History entry for one finished play session, passed or failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    at: SubRoundRef,
    score: i32,
    stars_earned: u8,
    passed: bool,
    hints_used: u32,
    reveals_used: u32,
    total_questions: u32,
    completed_at: DateTime<Utc>,
}

impl AttemptRecord {
    #[must_use]
    pub fn new(
        at: SubRoundRef,
        evaluation: Evaluation,
        hints_used: u32,
        reveals_used: u32,
        total_questions: u32,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            at,
            score: evaluation.score,
            stars_earned: evaluation.stars_earned,
            passed: evaluation.passed,
            hints_used,
            reveals_used,
            total_questions,
            completed_at,
        }
    }

    /// Rehydrate an attempt from storage, re-checking the scoring rules.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError` if the stored verdict or stars disagree with the
    /// score, or hints outnumber questions.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        at: SubRoundRef,
        score: i32,
        stars_earned: u8,
        passed: bool,
        hints_used: u32,
        reveals_used: u32,
        total_questions: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, AttemptError> {
        if stars_earned > MAX_STARS {
            return Err(AttemptError::StarsOutOfRange {
                stars: stars_earned,
            });
        }
        if passed != is_passing(score) || stars_earned != stars_for_score(score) {
            return Err(AttemptError::VerdictMismatch { score });
        }
        if hints_used > total_questions {
            return Err(AttemptError::TooManyHints {
                hints: hints_used,
                total: total_questions,
            });
        }
        Ok(Self {
            at,
            score,
            stars_earned,
            passed,
            hints_used,
            reveals_used,
            total_questions,
            completed_at,
        })
    }

    #[must_use]
    pub fn at(&self) -> SubRoundRef {
        self.at
    }

    #[must_use]
    pub fn score(&self) -> i32 {
        self.score
    }

    #[must_use]
    pub fn stars_earned(&self) -> u8 {
        self.stars_earned
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    #[must_use]
    pub fn hints_used(&self) -> u32 {
        self.hints_used
    }

    #[must_use]
    pub fn reveals_used(&self) -> u32 {
        self.reveals_used
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn persisted_attempt_must_agree_with_score() {
        let at = SubRoundRef::new(0, 0, 0);
        assert!(AttemptRecord::from_persisted(at, 9, 3, true, 1, 0, 10, fixed_now()).is_ok());

        let err = AttemptRecord::from_persisted(at, 8, 2, true, 0, 0, 10, fixed_now()).unwrap_err();
        assert_eq!(err, AttemptError::VerdictMismatch { score: 8 });

        let err =
            AttemptRecord::from_persisted(at, 6, 2, false, 0, 0, 10, fixed_now()).unwrap_err();
        assert_eq!(err, AttemptError::VerdictMismatch { score: 6 });
    }

    #[test]
    fn persisted_attempt_rejects_excess_hints() {
        let at = SubRoundRef::new(0, 0, 0);
        let err =
            AttemptRecord::from_persisted(at, -3, 0, false, 11, 0, 10, fixed_now()).unwrap_err();
        assert!(matches!(err, AttemptError::TooManyHints { hints: 11, total: 10 }));
    }
}
