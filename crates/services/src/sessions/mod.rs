mod controller;
mod hint;
mod progress;
mod timers;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use controller::{
    AnswerFeedback, AnswerKind, AnswerRecord, Hint, SessionController, SessionOutcome,
    SessionPhase, SessionStep,
};
pub use hint::hint_for;
pub use progress::SessionProgress;
pub use timers::{ManualTimers, TimerId, Timers, TokioTimers};
