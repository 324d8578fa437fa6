use quest_core::model::{AttemptRecord, SubRoundRef};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn index_to_i64(field: &'static str, v: usize) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn index_from_i64(field: &'static str, v: i64) -> Result<usize, StorageError> {
    usize::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn map_attempt_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<AttemptRecord, StorageError> {
    let at = SubRoundRef::new(
        index_from_i64("level_idx", row.try_get("level_idx").map_err(ser)?)?,
        index_from_i64("round_idx", row.try_get("round_idx").map_err(ser)?)?,
        index_from_i64("sub_round_idx", row.try_get("sub_round_idx").map_err(ser)?)?,
    );
    let score: i64 = row.try_get("score").map_err(ser)?;
    let score = i32::try_from(score)
        .map_err(|_| StorageError::Serialization(format!("invalid score: {score}")))?;
    let stars: i64 = row.try_get("stars_earned").map_err(ser)?;
    let stars = u8::try_from(stars)
        .map_err(|_| StorageError::Serialization(format!("invalid stars_earned: {stars}")))?;
    let passed: bool = row.try_get("passed").map_err(ser)?;

    AttemptRecord::from_persisted(
        at,
        score,
        stars,
        passed,
        u32_from_i64("hints_used", row.try_get("hints_used").map_err(ser)?)?,
        u32_from_i64("reveals_used", row.try_get("reveals_used").map_err(ser)?)?,
        u32_from_i64("total_questions", row.try_get("total_questions").map_err(ser)?)?,
        row.try_get("completed_at").map_err(ser)?,
    )
    .map_err(ser)
}
