use async_trait::async_trait;
use chrono::Utc;
use quest_core::model::QuestProgress;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::ser;
use crate::repository::{ProgressRepository, StorageError};

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load_progress(&self) -> Result<Option<QuestProgress>, StorageError> {
        let row = sqlx::query("SELECT payload FROM quest_progress WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let payload: String = row.try_get("payload").map_err(ser)?;
        serde_json::from_str(&payload).map(Some).map_err(ser)
    }

    async fn save_progress(&self, progress: &QuestProgress) -> Result<(), StorageError> {
        let payload = serde_json::to_string(progress).map_err(ser)?;

        sqlx::query(
            r"
            INSERT INTO quest_progress (id, payload, total_stars, updated_at)
            VALUES (1, ?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                payload = excluded.payload,
                total_stars = excluded.total_stars,
                updated_at = excluded.updated_at
            ",
        )
        .bind(payload)
        .bind(i64::from(progress.total_stars()))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}
