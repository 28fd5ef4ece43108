//! Hourly broadcast scheduler.
//!
//! Runs as a background task that fires at the top of every UTC hour and
//! hands the tick time to [`BroadcastTask::run`]. External cron setups can
//! use the `broadcast` subcommand instead.

use std::time::Duration;

use chrono::{DateTime, DurationRound, TimeDelta, Timelike, Utc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};

use super::broadcast::{BroadcastOutcome, BroadcastTask};

const BROADCAST_INTERVAL: Duration = Duration::from_secs(3600);

/// Time left until the next full UTC hour after `now`.
#[must_use]
pub fn until_next_hour(now: DateTime<Utc>) -> Duration {
    let into_hour = u64::from(now.minute() * 60 + now.second());
    BROADCAST_INTERVAL.saturating_sub(Duration::from_secs(into_hour))
}

/// The full hour a tick belongs to. Ticks follow the monotonic clock, so
/// one due at 09:00 may observe 08:59:59.9 on the wall clock.
#[must_use]
pub fn nearest_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    now.duration_round(TimeDelta::hours(1)).unwrap_or(now)
}

/// Spawn the broadcast background task.
///
/// The first run happens at the next top of the hour, then hourly until
/// `cancel` fires. A failed run is logged and the loop keeps going.
#[must_use]
pub fn spawn_broadcast_task(task: BroadcastTask, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let first = Instant::now() + until_next_hour(Utc::now());
        let mut interval = tokio::time::interval_at(first, BROADCAST_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("broadcast scheduler shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let now = nearest_hour(Utc::now());
                    let outcome = task
                        .run(now)
                        .instrument(info_span!("broadcast", hour = now.hour()))
                        .await;
                    if let BroadcastOutcome::Failed(_) = outcome {
                        info!("next broadcast attempt in one hour");
                    }
                }
            }
        }
    })
}
