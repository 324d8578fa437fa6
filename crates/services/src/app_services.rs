use std::sync::Arc;

use quest_core::Clock;
use quest_core::model::{QuestShape, RewardTable};
use storage::repository::Storage;

use crate::error::AppServicesError;
use crate::progress_store::ProgressStore;
use crate::question_bank::{QuestionBank, Selection};
use crate::reward_sink::RewardSink;

/// Assembles the progress store for a host app. The question bank is only
/// consulted when a fresh quest tree has to be drawn.
pub struct AppServices {
    store: ProgressStore,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization, the built-in
    /// catalog, or the initial tree fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        selection: Selection,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::with_storage(storage, clock, selection).await
    }

    /// Build services over an existing storage backend with the standard
    /// quest shape and reward table.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the catalog or the initial tree fails.
    pub async fn with_storage(
        storage: Storage,
        clock: Clock,
        selection: Selection,
    ) -> Result<Self, AppServicesError> {
        let shape = QuestShape::standard();
        let bank = QuestionBank::standard(shape, selection)?;
        let store = ProgressStore::load(storage, &bank, &shape, &RewardTable::standard())
            .await?
            .with_clock(clock);
        Ok(Self { store })
    }

    #[must_use]
    pub fn with_reward_sink(mut self, rewards: Arc<dyn RewardSink>) -> Self {
        self.store = self.store.with_reward_sink(rewards);
        self
    }

    #[must_use]
    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ProgressStore {
        &mut self.store
    }
}
