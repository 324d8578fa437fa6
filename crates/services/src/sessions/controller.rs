use std::sync::Arc;
use std::time::Duration;

use quest_core::model::{Question, QuestionId, SessionSettings, SubRoundRef};
use quest_core::scoring::{AnswerEvent, Evaluation, evaluate_session};
use tracing::debug;

use super::hint::hint_for;
use super::progress::SessionProgress;
use super::timers::{TimerId, Timers};
use crate::error::SessionError;

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Where the session is in its question loop. Indexes point into the
/// session's question list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Presenting(usize),
    HintShown(usize),
    Answered(usize),
    Complete,
    Abandoned,
}

/// How a question was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
    Submitted { selected: usize },
    Revealed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerRecord {
    pub question_id: QuestionId,
    pub kind: AnswerKind,
    pub is_correct: bool,
}

/// Returned when a question is resolved, before the advance timer fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub is_correct: bool,
    pub correct_index: usize,
    pub explanation: Option<String>,
    pub hearts: u32,
    pub advance_in: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    pub text: String,
    pub visible_for: Duration,
}

/// Final result of a completed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    pub at: SubRoundRef,
    pub evaluation: Evaluation,
    pub total_questions: usize,
    pub hints_used: u32,
    pub reveals_used: u32,
}

/// What a fired timer did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStep {
    HintDismissed,
    NextQuestion(usize),
    Completed(SessionOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerPurpose {
    DismissHint,
    Advance,
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Drives one play session over a sub-round's questions.
///
/// The controller never sleeps. Delayed transitions (hint dismissal, moving
/// on after an answer) are requested from the injected `Timers` and applied
/// when the host reports the fired id through [`Self::on_timer`]. At most one
/// timer is pending at a time; ids that are no longer pending are ignored.
pub struct SessionController<T: Timers> {
    at: SubRoundRef,
    questions: Vec<Question>,
    settings: SessionSettings,
    timers: T,
    phase: SessionPhase,
    answers: Vec<AnswerRecord>,
    hearts: u32,
    currency: u32,
    hints_used: u32,
    reveals_used: u32,
    hinted_current: bool,
    pending: Option<(TimerId, TimerPurpose)>,
    outcome: Option<SessionOutcome>,
    // Set when a store opened the session; dropping it frees the store's slot.
    lease: Option<Arc<SubRoundRef>>,
}

impl<T: Timers> SessionController<T> {
    /// Create an idle session for the sub-round at `at`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no questions are provided.
    pub fn new(
        at: SubRoundRef,
        questions: Vec<Question>,
        settings: SessionSettings,
        timers: T,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }

        Ok(Self {
            at,
            questions,
            hearts: settings.hearts(),
            currency: settings.starting_currency(),
            settings,
            timers,
            phase: SessionPhase::Idle,
            answers: Vec::new(),
            hints_used: 0,
            reveals_used: 0,
            hinted_current: false,
            pending: None,
            outcome: None,
            lease: None,
        })
    }

    pub(crate) fn with_lease(mut self, lease: Arc<SubRoundRef>) -> Self {
        self.lease = Some(lease);
        self
    }

    pub(crate) fn lease(&self) -> Option<&Arc<SubRoundRef>> {
        self.lease.as_ref()
    }

    /// Present the first question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyStarted` unless the session is idle.
    pub fn begin(&mut self) -> Result<&Question, SessionError> {
        match self.phase {
            SessionPhase::Idle => {}
            SessionPhase::Complete => return Err(SessionError::Completed),
            SessionPhase::Abandoned => return Err(SessionError::Abandoned),
            _ => return Err(SessionError::AlreadyStarted),
        }
        self.phase = SessionPhase::Presenting(0);
        debug!(at = %self.at, total = self.questions.len(), "session started");
        Ok(&self.questions[0])
    }

    /// Answer the current question. A wrong answer costs one heart.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyAnswered` while waiting to advance,
    /// `InvalidOption` for an out-of-range choice, and the lifecycle errors
    /// when no question is showing. The session is unchanged on error.
    pub fn submit_answer(&mut self, selected: usize) -> Result<AnswerFeedback, SessionError> {
        let index = self.active_index()?;
        let question = &self.questions[index];
        let len = question.options().len();
        if selected >= len {
            return Err(SessionError::InvalidOption {
                index: selected,
                len,
            });
        }

        let is_correct = question.is_correct(selected);
        if !is_correct {
            self.hearts = self.hearts.saturating_sub(1);
        }
        self.record(index, AnswerKind::Submitted { selected }, is_correct);
        Ok(self.resolve(index, is_correct))
    }

    /// Buy a partial clue for the current question, once per question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyHinted` for a second hint on the same
    /// question and `InsufficientCurrency` when the balance is too low.
    pub fn request_hint(&mut self) -> Result<Hint, SessionError> {
        let index = self.active_index()?;
        if self.hinted_current {
            return Err(SessionError::AlreadyHinted);
        }
        self.spend(self.settings.hint_cost())?;
        self.hints_used += 1;
        self.hinted_current = true;
        self.phase = SessionPhase::HintShown(index);

        let visible_for = self.settings.hint_display();
        self.schedule(visible_for, TimerPurpose::DismissHint);
        debug!(at = %self.at, question = index, currency = self.currency, "hint shown");
        Ok(Hint {
            text: hint_for(&self.questions[index]),
            visible_for,
        })
    }

    /// Buy the answer to the current question. Scored as incorrect.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InsufficientCurrency` when the balance is too
    /// low, and the same lifecycle errors as [`Self::submit_answer`].
    pub fn reveal_answer(&mut self) -> Result<AnswerFeedback, SessionError> {
        let index = self.active_index()?;
        self.spend(self.settings.reveal_cost())?;
        self.reveals_used += 1;
        self.record(index, AnswerKind::Revealed, false);
        Ok(self.resolve(index, false))
    }

    /// Apply a fired timer. Returns `None` for ids that are no longer pending.
    pub fn on_timer(&mut self, id: TimerId) -> Option<SessionStep> {
        let purpose = match self.pending {
            Some((pending, purpose)) if pending == id => purpose,
            _ => {
                debug!(?id, "ignoring stale timer");
                return None;
            }
        };
        self.pending = None;

        match (purpose, self.phase) {
            (TimerPurpose::DismissHint, SessionPhase::HintShown(index)) => {
                self.phase = SessionPhase::Presenting(index);
                Some(SessionStep::HintDismissed)
            }
            (TimerPurpose::Advance, SessionPhase::Answered(index)) => Some(self.advance(index)),
            _ => None,
        }
    }

    /// Leave the session without scoring it. Pending timers are cancelled and
    /// the owning store may open another session.
    pub fn abandon(&mut self) {
        if matches!(self.phase, SessionPhase::Complete | SessionPhase::Abandoned) {
            return;
        }
        self.cancel_pending();
        self.lease = None;
        self.phase = SessionPhase::Abandoned;
        debug!(at = %self.at, answered = self.answers.len(), "session abandoned");
    }

    #[must_use]
    pub fn at(&self) -> SubRoundRef {
        self.at
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// The question on screen, including one that is answered and waiting
    /// to advance.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            SessionPhase::Presenting(i)
            | SessionPhase::HintShown(i)
            | SessionPhase::Answered(i) => {
                self.questions.get(i)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    #[must_use]
    pub fn hearts(&self) -> u32 {
        self.hearts
    }

    #[must_use]
    pub fn currency(&self) -> u32 {
        self.currency
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
    pub fn outcome(&self) -> Option<SessionOutcome> {
        self.outcome
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outcome.is_some()
    }

    /// Returns a summary of the current session progress.
    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.questions.len(),
            answered: self.answers.len(),
            remaining: self.questions.len().saturating_sub(self.answers.len()),
            hearts: self.hearts,
            currency: self.currency,
            hints_used: self.hints_used,
            is_complete: self.is_complete(),
        }
    }

    #[must_use]
    pub fn timers(&self) -> &T {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut T {
        &mut self.timers
    }

    fn active_index(&self) -> Result<usize, SessionError> {
        match self.phase {
            SessionPhase::Presenting(i) | SessionPhase::HintShown(i) => Ok(i),
            SessionPhase::Answered(_) => Err(SessionError::AlreadyAnswered),
            SessionPhase::Idle => Err(SessionError::NotStarted),
            SessionPhase::Complete => Err(SessionError::Completed),
            SessionPhase::Abandoned => Err(SessionError::Abandoned),
        }
    }

    fn spend(&mut self, cost: u32) -> Result<(), SessionError> {
        if self.currency < cost {
            return Err(SessionError::InsufficientCurrency {
                needed: cost,
                available: self.currency,
            });
        }
        self.currency -= cost;
        Ok(())
    }

    fn record(&mut self, index: usize, kind: AnswerKind, is_correct: bool) {
        self.answers.push(AnswerRecord {
            question_id: self.questions[index].id(),
            kind,
            is_correct,
        });
    }

    fn resolve(&mut self, index: usize, is_correct: bool) -> AnswerFeedback {
        self.phase = SessionPhase::Answered(index);
        let question = &self.questions[index];
        let advance_in = self.settings.advance_delay(question.prompt());
        let feedback = AnswerFeedback {
            is_correct,
            correct_index: question.correct_index(),
            explanation: question.explanation().map(str::to_owned),
            hearts: self.hearts,
            advance_in,
        };
        self.schedule(advance_in, TimerPurpose::Advance);
        debug!(at = %self.at, question = index, is_correct, "question resolved");
        feedback
    }

    fn advance(&mut self, index: usize) -> SessionStep {
        self.hinted_current = false;
        let next = index + 1;
        if next < self.questions.len() {
            self.phase = SessionPhase::Presenting(next);
            return SessionStep::NextQuestion(next);
        }

        let events: Vec<AnswerEvent> = self
            .answers
            .iter()
            .map(|a| AnswerEvent {
                is_correct: a.is_correct,
            })
            .collect();
        let outcome = SessionOutcome {
            at: self.at,
            evaluation: evaluate_session(&events, self.hints_used),
            total_questions: self.questions.len(),
            hints_used: self.hints_used,
            reveals_used: self.reveals_used,
        };
        self.phase = SessionPhase::Complete;
        self.outcome = Some(outcome);
        debug!(
            at = %self.at,
            score = outcome.evaluation.score,
            passed = outcome.evaluation.passed,
            "session complete"
        );
        SessionStep::Completed(outcome)
    }

    fn schedule(&mut self, delay: Duration, purpose: TimerPurpose) {
        self.cancel_pending();
        let id = self.timers.schedule(delay);
        self.pending = Some((id, purpose));
    }

    fn cancel_pending(&mut self) {
        if let Some((id, _)) = self.pending.take() {
            self.timers.cancel(id);
        }
    }
}

impl<T: Timers> Drop for SessionController<T> {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
