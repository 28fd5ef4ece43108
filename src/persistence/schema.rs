//! `SQLite` schema bootstrap logic.
//!
//! All table definitions use `CREATE TABLE IF NOT EXISTS` and are safe to
//! re-run on every startup.

use sqlx::SqlitePool;

use crate::Result;

/// Apply all table definitions to the connected `SQLite` database.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS joke (
    id                  INTEGER PRIMARY KEY NOT NULL,
    prompt              TEXT NOT NULL,
    button_label        TEXT NOT NULL,
    answer              TEXT NOT NULL,
    answer_image_url    TEXT NOT NULL,
    consumed_at         TEXT
);

CREATE TABLE IF NOT EXISTS subscriber (
    id                      TEXT PRIMARY KEY NOT NULL,
    timezone_offset_hours   INTEGER NOT NULL,
    profile                 TEXT NOT NULL,
    created_at              TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_joke_consumed ON joke(consumed_at);
CREATE INDEX IF NOT EXISTS idx_subscriber_offset ON subscriber(timezone_offset_hours);
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}
