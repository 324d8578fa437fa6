use async_trait::async_trait;
use quest_core::model::{AttemptRecord, QuestProgress, SubRoundRef};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for the quest progression snapshot.
///
/// There is exactly one `QuestProgress` per store; saving replaces it.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the saved snapshot, or `None` on first run.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot exists but cannot be read.
    async fn load_progress(&self) -> Result<Option<QuestProgress>, StorageError>;

    /// Persist the snapshot, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be stored.
    async fn save_progress(&self, progress: &QuestProgress) -> Result<(), StorageError>;
}

/// Append-only history of finished play sessions.
#[async_trait]
pub trait AttemptLogRepository: Send + Sync {
    /// Append an attempt and return its row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn append_attempt(&self, attempt: &AttemptRecord) -> Result<i64, StorageError>;

    /// Attempts for one sub-round, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn list_attempts(&self, at: SubRoundRef) -> Result<Vec<AttemptRecord>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<Option<QuestProgress>>>,
    attempts: Arc<Mutex<Vec<AttemptRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load_progress(&self) -> Result<Option<QuestProgress>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn save_progress(&self, progress: &QuestProgress) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = Some(progress.clone());
        Ok(())
    }
}

#[async_trait]
impl AttemptLogRepository for InMemoryRepository {
    async fn append_attempt(&self, attempt: &AttemptRecord) -> Result<i64, StorageError> {
        let mut guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.push(attempt.clone());
        i64::try_from(guard.len()).map_err(|_| StorageError::Conflict)
    }

    async fn list_attempts(&self, at: SubRoundRef) -> Result<Vec<AttemptRecord>, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.iter().filter(|a| a.at() == at).cloned().collect())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
    pub attempts: Arc<dyn AttemptLogRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptLogRepository> = Arc::new(repo);
        Self { progress, attempts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quest_core::model::{QuestShape, QuestionDraft, QuestionId, QuestionSource, RewardTable};
    use quest_core::scoring::{AnswerEvent, evaluate_session};
    use quest_core::time::fixed_now;

    struct OneQuestion;

    impl QuestionSource for OneQuestion {
        fn questions_for_sub_round(
            &self,
            _round: usize,
            _sub_round: usize,
        ) -> Vec<quest_core::model::Question> {
            vec![
                QuestionDraft {
                    id: QuestionId::new(1),
                    prompt: "Is milk dairy?".into(),
                    options: vec!["Yes".into(), "No".into()],
                    correct_index: 0,
                    topic: "Dairy".into(),
                    explanation: None,
                }
                .validate()
                .unwrap(),
            ]
        }
    }

    #[tokio::test]
    async fn empty_repository_has_no_progress() {
        let repo = InMemoryRepository::new();
        assert!(repo.load_progress().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_replaces_snapshot() {
        let repo = InMemoryRepository::new();
        let shape = QuestShape::new(1, 1, 2, 1).unwrap();
        let progress =
            QuestProgress::build(&shape, &RewardTable::standard(), &OneQuestion).unwrap();

        repo.save_progress(&progress).await.unwrap();
        let loaded = repo.load_progress().await.unwrap().unwrap();
        assert_eq!(loaded, progress);
    }

    #[tokio::test]
    async fn attempts_filter_by_sub_round() {
        let repo = InMemoryRepository::new();
        let eval = evaluate_session(&[AnswerEvent::correct()], 0);
        let a = AttemptRecord::new(SubRoundRef::new(0, 0, 0), eval, 0, 0, 1, fixed_now());
        let b = AttemptRecord::new(SubRoundRef::new(0, 0, 1), eval, 0, 0, 1, fixed_now());
        assert_eq!(repo.append_attempt(&a).await.unwrap(), 1);
        assert_eq!(repo.append_attempt(&b).await.unwrap(), 2);

        let listed = repo.list_attempts(SubRoundRef::new(0, 0, 0)).await.unwrap();
        assert_eq!(listed, vec![a]);
    }
}
