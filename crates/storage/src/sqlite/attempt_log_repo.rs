use async_trait::async_trait;
use quest_core::model::{AttemptRecord, SubRoundRef};

use super::SqliteRepository;
use super::mapping::{index_to_i64, map_attempt_row};
use crate::repository::{AttemptLogRepository, StorageError};

#[async_trait]
impl AttemptLogRepository for SqliteRepository {
    async fn append_attempt(&self, attempt: &AttemptRecord) -> Result<i64, StorageError> {
        let at = attempt.at();
        let res = sqlx::query(
            r"
                INSERT INTO attempts (
                    level_idx, round_idx, sub_round_idx, score, stars_earned, passed,
                    hints_used, reveals_used, total_questions, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(index_to_i64("level_idx", at.level)?)
        .bind(index_to_i64("round_idx", at.round)?)
        .bind(index_to_i64("sub_round_idx", at.sub_round)?)
        .bind(i64::from(attempt.score()))
        .bind(i64::from(attempt.stars_earned()))
        .bind(attempt.passed())
        .bind(i64::from(attempt.hints_used()))
        .bind(i64::from(attempt.reveals_used()))
        .bind(i64::from(attempt.total_questions()))
        .bind(attempt.completed_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }

    async fn list_attempts(&self, at: SubRoundRef) -> Result<Vec<AttemptRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    level_idx, round_idx, sub_round_idx, score, stars_earned, passed,
                    hints_used, reveals_used, total_questions, completed_at
                FROM attempts
                WHERE level_idx = ?1 AND round_idx = ?2 AND sub_round_idx = ?3
                ORDER BY completed_at ASC, id ASC
            ",
        )
        .bind(index_to_i64("level_idx", at.level)?)
        .bind(index_to_i64("round_idx", at.round)?)
        .bind(index_to_i64("sub_round_idx", at.sub_round)?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_attempt_row).collect()
    }
}
