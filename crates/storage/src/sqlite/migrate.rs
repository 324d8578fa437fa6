use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned schema migrations.
///
/// Version 1 creates the progress snapshot table and the attempt history.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        // Single-row table: the whole tree is one JSON document.
        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS quest_progress (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    payload TEXT NOT NULL,
                    total_stars INTEGER NOT NULL CHECK (total_stars >= 0),
                    updated_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS attempts (
                    id INTEGER PRIMARY KEY,
                    level_idx INTEGER NOT NULL CHECK (level_idx >= 0),
                    round_idx INTEGER NOT NULL CHECK (round_idx >= 0),
                    sub_round_idx INTEGER NOT NULL CHECK (sub_round_idx >= 0),
                    score INTEGER NOT NULL,
                    stars_earned INTEGER NOT NULL CHECK (stars_earned BETWEEN 0 AND 3),
                    passed INTEGER NOT NULL CHECK (passed IN (0, 1)),
                    hints_used INTEGER NOT NULL CHECK (hints_used >= 0),
                    reveals_used INTEGER NOT NULL CHECK (reveals_used >= 0),
                    total_questions INTEGER NOT NULL CHECK (total_questions >= 0),
                    completed_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_attempts_sub_round_completed
                    ON attempts (level_idx, round_idx, sub_round_idx, completed_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
