mod attempt;
mod ids;
mod progress;
mod question;
mod rewards;
mod settings;

pub use attempt::{AttemptError, AttemptRecord};
pub use ids::{NodeRef, ParseIdError, QuestionId, RoundRef, SubRoundRef};
pub use progress::{
    InvariantViolation, Level, MAX_STARS, ProgressError, QuestProgress, QuestionSource, Round,
    SubRound, Tier,
};
pub use question::{Question, QuestionDraft, QuestionError};
pub use rewards::{Difficulty, RewardTable, Rewards};
pub use settings::{QuestShape, SessionSettings, SettingsError};

#[cfg(test)]
pub(crate) use progress::tests as progress_fixtures;
