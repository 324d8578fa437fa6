#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod progress_store;
pub mod question_bank;
pub mod reward_sink;
pub mod sessions;

pub use quest_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use error::{AppServicesError, QuestionBankError, SessionError, StoreError};
pub use progress_store::{ProgressStore, SessionStart, StoreUpdate};
pub use question_bank::{QuestionBank, Selection};
pub use reward_sink::{LogRewardSink, RewardSink};
pub use sessions::{
    AnswerFeedback, Hint, ManualTimers, SessionController, SessionOutcome, SessionPhase,
    SessionProgress, SessionStep, TimerId, Timers, TokioTimers,
};
