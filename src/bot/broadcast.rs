//! Daily broadcast to the subscribers whose local time just turned the
//! broadcast hour.
//!
//! Runs once per UTC hour. Each run sends at most one joke, to one timezone
//! bucket, and marks that joke consumed before fanning out so a crash
//! mid-fan-out cannot cause the same joke to be picked again next hour.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use tracing::{info, warn};

use crate::bot::conversation::joke_card;
use crate::bot::selector::{ConsumptionPolicy, ContentSelector, Uniqueness};
use crate::messenger::{DeliveryChannel, MessagingType};
use crate::models::user::{MAX_UTC_OFFSET, MIN_UTC_OFFSET};
use crate::persistence::db::{self, Database};
use crate::persistence::user_repo::UserRepo;
use crate::{AppError, Result};

/// UTC offsets (whole hours, within the real-world range) for which
/// `now_hour_utc` is `local_hour` local time.
///
/// Usually one offset; two when the bucket straddles the date line
/// (e.g. at 20:00 UTC both −11 and +13 are at 09:00).
#[must_use]
pub fn offsets_at_local_hour(now_hour_utc: u32, local_hour: u32) -> Vec<i32> {
    let (Ok(now), Ok(local)) = (i32::try_from(now_hour_utc), i32::try_from(local_hour)) else {
        return Vec::new();
    };
    let base = local - now;
    [base - 24, base, base + 24]
        .into_iter()
        .filter(|offset| (MIN_UTC_OFFSET..=MAX_UTC_OFFSET).contains(offset))
        .collect()
}

/// What a broadcast run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Recipients a delivery was attempted for.
    pub recipients_sent: usize,
    /// Deliveries the platform accepted.
    pub delivered: usize,
    /// Joke that went out, if any.
    pub joke_id: Option<i64>,
}

/// Terminal result of a broadcast run. Failures are captured here rather
/// than returned as errors so the scheduler always gets an outcome.
#[derive(Debug)]
pub enum BroadcastOutcome {
    /// The run finished; zero sends is a normal completion.
    Completed(BroadcastReport),
    /// The run stopped on a store failure.
    Failed(AppError),
}

impl BroadcastOutcome {
    /// Recipients attempted, zero for failed runs.
    #[must_use]
    pub fn recipients_sent(&self) -> usize {
        match self {
            Self::Completed(report) => report.recipients_sent,
            Self::Failed(_) => 0,
        }
    }
}

impl Display for BroadcastOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed(report) => match report.joke_id {
                Some(id) => write!(
                    f,
                    "sent joke {id} to {}/{} recipients",
                    report.delivered, report.recipients_sent
                ),
                None => write!(f, "nothing sent"),
            },
            Self::Failed(err) => write!(f, "broadcast failed: {err}"),
        }
    }
}

/// Scheduled broadcast entrypoint.
#[derive(Clone)]
pub struct BroadcastTask {
    db: Arc<Database>,
    channel: Arc<dyn DeliveryChannel>,
    selector: ContentSelector,
    local_hour: u32,
}

impl BroadcastTask {
    /// Create a task broadcasting at `local_hour` under `policy`.
    #[must_use]
    pub fn new(
        db: Arc<Database>,
        channel: Arc<dyn DeliveryChannel>,
        policy: ConsumptionPolicy,
        local_hour: u32,
    ) -> Self {
        Self {
            db,
            channel,
            selector: ContentSelector::new(policy),
            local_hour,
        }
    }

    /// Run one broadcast for the hour containing `now`.
    pub async fn run(&self, now: DateTime<Utc>) -> BroadcastOutcome {
        match self.try_run(now).await {
            Ok(report) => {
                info!(
                    recipients = report.recipients_sent,
                    delivered = report.delivered,
                    joke_id = report.joke_id,
                    "broadcast finished"
                );
                BroadcastOutcome::Completed(report)
            }
            Err(err) => {
                warn!(%err, "broadcast failed");
                BroadcastOutcome::Failed(err)
            }
        }
    }

    async fn try_run(&self, now: DateTime<Utc>) -> Result<BroadcastReport> {
        let mut conn = db::acquire(&self.db).await?;

        let offsets = offsets_at_local_hour(now.hour(), self.local_hour);
        let recipients = UserRepo::new(&mut conn).list_by_offsets(&offsets).await?;
        if recipients.is_empty() {
            info!(?offsets, "no subscribers at broadcast hour");
            return Ok(BroadcastReport::default());
        }

        let joke = match self.selector.pick(&mut conn, Uniqueness::Unseen, now).await {
            Ok(joke) => joke,
            Err(AppError::NoContentAvailable(reason)) => {
                info!(%reason, recipients = recipients.len(), "no unseen joke; skipping broadcast");
                return Ok(BroadcastReport::default());
            }
            Err(err) => return Err(err),
        };
        self.selector.mark_consumed(&mut conn, &joke, now).await?;
        drop(conn);

        let card = joke_card(&joke);
        let mut delivered = 0;
        for user in &recipients {
            match self
                .channel
                .send(&user.id, &card, MessagingType::Update)
                .await
            {
                Ok(()) => delivered += 1,
                Err(err) => warn!(%err, recipient = %user.id, joke_id = joke.id, "broadcast delivery failed"),
            }
        }

        Ok(BroadcastReport {
            recipients_sent: recipients.len(),
            delivered,
            joke_id: Some(joke.id),
        })
    }
}
