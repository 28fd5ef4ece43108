//! Subscriber repository for `SQLite` persistence.

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::models::user::User;
use crate::{AppError, Result};

use super::db::{decode_timestamp, encode_timestamp};

/// Repository for subscriber records, bound to one invocation's connection.
pub struct UserRepo<'c> {
    conn: &'c mut SqliteConnection,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    timezone_offset_hours: i64,
    profile: String,
    created_at: String,
}

impl UserRow {
    fn into_user(self) -> Result<User> {
        let timezone_offset_hours = i32::try_from(self.timezone_offset_hours)
            .map_err(|err| AppError::Db(format!("invalid timezone_offset_hours: {err}")))?;
        let profile = serde_json::from_str(&self.profile)
            .map_err(|err| AppError::Db(format!("invalid profile: {err}")))?;
        let created_at = decode_timestamp("created_at", &self.created_at)?;

        Ok(User {
            id: self.id,
            timezone_offset_hours,
            profile,
            created_at,
        })
    }
}

impl<'c> UserRepo<'c> {
    /// Create a repository over `conn`.
    #[must_use]
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Retrieve a subscriber by sender id.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get(&mut self, id: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, timezone_offset_hours, profile, created_at
             FROM subscriber WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    /// Store `user` unless a record with the same id already exists.
    ///
    /// Existing records are never touched. Returns `true` when a new record
    /// was written.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails.
    pub async fn ensure(&mut self, user: &User) -> Result<bool> {
        let profile = serde_json::to_string(&user.profile)
            .map_err(|err| AppError::Db(format!("failed to encode profile: {err}")))?;

        let result = sqlx::query(
            "INSERT INTO subscriber (id, timezone_offset_hours, profile, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(&user.id)
        .bind(i64::from(user.timezone_offset_hours))
        .bind(profile)
        .bind(encode_timestamp(user.created_at))
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// List subscribers whose offset is one of `offsets`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_by_offsets(&mut self, offsets: &[i32]) -> Result<Vec<User>> {
        if offsets.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, timezone_offset_hours, profile, created_at
             FROM subscriber WHERE timezone_offset_hours IN (",
        );
        let mut separated = builder.separated(", ");
        for offset in offsets {
            separated.push_bind(i64::from(*offset));
        }
        separated.push_unseparated(") ORDER BY created_at ASC, id ASC");

        let rows: Vec<UserRow> = builder
            .build_query_as()
            .fetch_all(&mut *self.conn)
            .await?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    /// Count all subscribers.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn count(&mut self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscriber")
            .fetch_one(&mut *self.conn)
            .await?;
        u64::try_from(count).map_err(|err| AppError::Db(format!("negative count: {err}")))
    }
}
