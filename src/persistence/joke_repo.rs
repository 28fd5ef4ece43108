//! Joke repository for `SQLite` persistence.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::models::joke::{Joke, NewJoke};
use crate::{AppError, Result};

use super::db::{decode_timestamp, encode_timestamp};

const JOKE_COLUMNS: &str = "id, prompt, button_label, answer, answer_image_url, consumed_at";

/// Storage-level filter on the consumption marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// Every joke.
    Any,
    /// Jokes that were never broadcast.
    NeverConsumed,
    /// Jokes never broadcast, or last broadcast strictly before the cutoff.
    ConsumedBefore(DateTime<Utc>),
}

impl Eligibility {
    fn predicate(self) -> &'static str {
        match self {
            Self::Any => "1 = 1",
            Self::NeverConsumed => "consumed_at IS NULL",
            Self::ConsumedBefore(_) => "(consumed_at IS NULL OR consumed_at < ?)",
        }
    }

    fn cutoff(self) -> Option<String> {
        match self {
            Self::ConsumedBefore(cutoff) => Some(encode_timestamp(cutoff)),
            Self::Any | Self::NeverConsumed => None,
        }
    }
}

/// Repository for joke records, bound to one invocation's connection.
pub struct JokeRepo<'c> {
    conn: &'c mut SqliteConnection,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct JokeRow {
    id: i64,
    prompt: String,
    button_label: String,
    answer: String,
    answer_image_url: String,
    consumed_at: Option<String>,
}

impl JokeRow {
    fn into_joke(self) -> Result<Joke> {
        let consumed_at = self
            .consumed_at
            .as_deref()
            .map(|raw| decode_timestamp("consumed_at", raw))
            .transpose()?;

        Ok(Joke {
            id: self.id,
            prompt: self.prompt,
            button_label: self.button_label,
            answer: self.answer,
            answer_image_url: self.answer_image_url,
            consumed_at,
        })
    }
}

impl<'c> JokeRepo<'c> {
    /// Create a repository over `conn`.
    #[must_use]
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Insert seed content, returning the stored joke with its new id.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails.
    pub async fn insert(&mut self, joke: &NewJoke) -> Result<Joke> {
        let result = sqlx::query(
            "INSERT INTO joke (prompt, button_label, answer, answer_image_url, consumed_at)
             VALUES (?1, ?2, ?3, ?4, NULL)",
        )
        .bind(&joke.prompt)
        .bind(&joke.button_label)
        .bind(&joke.answer)
        .bind(&joke.answer_image_url)
        .execute(&mut *self.conn)
        .await?;

        Ok(Joke {
            id: result.last_insert_rowid(),
            prompt: joke.prompt.clone(),
            button_label: joke.button_label.clone(),
            answer: joke.answer.clone(),
            answer_image_url: joke.answer_image_url.clone(),
            consumed_at: None,
        })
    }

    /// Retrieve a joke by identifier.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no joke has this id, or `AppError::Db`
    /// if the query fails.
    pub async fn get_by_id(&mut self, id: i64) -> Result<Joke> {
        let row: Option<JokeRow> =
            sqlx::query_as(&format!("SELECT {JOKE_COLUMNS} FROM joke WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&mut *self.conn)
                .await?;

        row.ok_or_else(|| AppError::NotFound(format!("joke {id} not found")))?
            .into_joke()
    }

    /// Count jokes matching `eligibility`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn count_eligible(&mut self, eligibility: Eligibility) -> Result<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM joke WHERE {}",
            eligibility.predicate()
        );
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        if let Some(cutoff) = eligibility.cutoff() {
            query = query.bind(cutoff);
        }
        let count = query.fetch_one(&mut *self.conn).await?;
        u64::try_from(count).map_err(|err| AppError::Db(format!("negative count: {err}")))
    }

    /// Fetch the joke at position `offset` among those matching
    /// `eligibility`, in id order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn nth_eligible(
        &mut self,
        eligibility: Eligibility,
        offset: u64,
    ) -> Result<Option<Joke>> {
        let offset = i64::try_from(offset)
            .map_err(|err| AppError::Db(format!("offset out of range: {err}")))?;
        let sql = format!(
            "SELECT {JOKE_COLUMNS} FROM joke WHERE {} ORDER BY id ASC LIMIT 1 OFFSET ?",
            eligibility.predicate()
        );
        let mut query = sqlx::query_as::<_, JokeRow>(&sql);
        if let Some(cutoff) = eligibility.cutoff() {
            query = query.bind(cutoff);
        }
        let row = query.bind(offset).fetch_optional(&mut *self.conn).await?;
        row.map(JokeRow::into_joke).transpose()
    }

    /// Record that joke `id` was broadcast at `at`. Re-marking simply moves
    /// the timestamp.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no joke has this id, or `AppError::Db`
    /// if the update fails.
    pub async fn mark_consumed(&mut self, id: i64, at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query("UPDATE joke SET consumed_at = ?1 WHERE id = ?2")
            .bind(encode_timestamp(at))
            .bind(id)
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("joke {id} not found")));
        }
        Ok(())
    }

    /// List jokes broadcast at or after `since`, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_consumed_since(&mut self, since: DateTime<Utc>) -> Result<Vec<Joke>> {
        let rows: Vec<JokeRow> = sqlx::query_as(&format!(
            "SELECT {JOKE_COLUMNS} FROM joke
             WHERE consumed_at IS NOT NULL AND consumed_at >= ?1
             ORDER BY consumed_at DESC"
        ))
        .bind(encode_timestamp(since))
        .fetch_all(&mut *self.conn)
        .await?;

        rows.into_iter().map(JokeRow::into_joke).collect()
    }
}
