//! Shared error types for the services crate.

use thiserror::Error;

use quest_core::model::{ProgressError, QuestionError, QuestionId, SubRoundRef};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted while assembling a `QuestionBank`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionBankError {
    #[error("catalog has {available} questions, a sub-round needs {needed}")]
    TooFewQuestions { needed: usize, available: usize },
    #[error("duplicate question id {0}")]
    DuplicateId(QuestionId),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error("invalid question catalog: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors emitted by a play session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    #[error("session already started")]
    AlreadyStarted,
    #[error("session has not started")]
    NotStarted,
    #[error("session is still in progress")]
    InProgress,
    #[error("session already completed")]
    Completed,
    #[error("session was abandoned")]
    Abandoned,
    #[error("question already answered")]
    AlreadyAnswered,
    #[error("hint already used for this question")]
    AlreadyHinted,
    #[error("option {index} does not exist ({len} options)")]
    InvalidOption { index: usize, len: usize },
    #[error("not enough stars: need {needed}, have {available}")]
    InsufficientCurrency { needed: u32, available: u32 },
}

/// Errors emitted by `ProgressStore`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("a session for {0} is already in progress")]
    SessionActive(SubRoundRef),
    #[error("no active session for {0}")]
    NoActiveSession(SubRoundRef),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    QuestionBank(#[from] QuestionBankError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
