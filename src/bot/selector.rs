//! Content selection and consumption tracking.
//!
//! Interactive requests may repeat jokes; broadcasts draw from jokes that are
//! still "unseen" under the configured [`ConsumptionPolicy`]. Selection is a
//! uniform draw over the eligible set: count, pick a random offset, fetch
//! that row.

use chrono::{DateTime, Months, Utc};
use rand::Rng;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::config::{PolicyKind, SelectionConfig};
use crate::models::joke::Joke;
use crate::persistence::joke_repo::{Eligibility, JokeRepo};
use crate::{AppError, Result};

/// When a broadcast joke may be broadcast again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumptionPolicy {
    /// Once broadcast, never eligible again.
    NeverRepeat,
    /// Eligible again once `months` calendar months have passed.
    Rotation {
        /// Window length in calendar months.
        months: u32,
    },
}

impl From<&SelectionConfig> for ConsumptionPolicy {
    fn from(config: &SelectionConfig) -> Self {
        match config.policy {
            PolicyKind::NeverRepeat => Self::NeverRepeat,
            PolicyKind::MonthlyRotation => Self::Rotation {
                months: config.rotation_months,
            },
        }
    }
}

/// Whether a pick may return a joke that was already broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uniqueness {
    /// Any joke (interactive requests).
    RepeatsAllowed,
    /// Only jokes eligible under the consumption policy (broadcasts).
    Unseen,
}

/// Picks jokes and records broadcasts.
#[derive(Debug, Clone, Copy)]
pub struct ContentSelector {
    policy: ConsumptionPolicy,
}

impl ContentSelector {
    /// Create a selector applying `policy` to unique picks.
    #[must_use]
    pub fn new(policy: ConsumptionPolicy) -> Self {
        Self { policy }
    }

    /// The policy in force.
    #[must_use]
    pub fn policy(&self) -> ConsumptionPolicy {
        self.policy
    }

    /// Storage filter for a pick made at `now`.
    #[must_use]
    pub fn eligibility(&self, uniqueness: Uniqueness, now: DateTime<Utc>) -> Eligibility {
        match (uniqueness, self.policy) {
            (Uniqueness::RepeatsAllowed, _) => Eligibility::Any,
            (Uniqueness::Unseen, ConsumptionPolicy::NeverRepeat) => Eligibility::NeverConsumed,
            (Uniqueness::Unseen, ConsumptionPolicy::Rotation { months }) => now
                .checked_sub_months(Months::new(months))
                .map_or(Eligibility::NeverConsumed, Eligibility::ConsumedBefore),
        }
    }

    /// Pick one joke uniformly at random from the eligible set.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NoContentAvailable` if nothing is eligible, or
    /// `AppError::Db` if the store fails.
    pub async fn pick(
        &self,
        conn: &mut SqliteConnection,
        uniqueness: Uniqueness,
        now: DateTime<Utc>,
    ) -> Result<Joke> {
        let eligibility = self.eligibility(uniqueness, now);
        let mut repo = JokeRepo::new(conn);

        let count = repo.count_eligible(eligibility).await?;
        if count == 0 {
            return Err(AppError::NoContentAvailable(format!(
                "no joke eligible under {eligibility:?}"
            )));
        }

        let offset = rand::thread_rng().gen_range(0..count);
        debug!(count, offset, ?eligibility, "picking joke");

        repo.nth_eligible(eligibility, offset).await?.ok_or_else(|| {
            AppError::NoContentAvailable("eligible set shrank during selection".into())
        })
    }

    /// Record that `joke` was broadcast at `now`. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the joke no longer exists, or
    /// `AppError::Db` if the store fails.
    pub async fn mark_consumed(
        &self,
        conn: &mut SqliteConnection,
        joke: &Joke,
        now: DateTime<Utc>,
    ) -> Result<()> {
        JokeRepo::new(conn).mark_consumed(joke.id, now).await
    }
}
