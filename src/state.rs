//! Shared application state handed to every invocation.

use std::sync::Arc;

use crate::bot::broadcast::BroadcastTask;
use crate::bot::conversation::Conversation;
use crate::config::GlobalConfig;
use crate::messenger::{DeliveryChannel, PageSettings};
use crate::models::reply::{JOKE_PAYLOAD, START_PAYLOAD};
use crate::persistence::db::Database;

/// Immutable state shared by the webhook server and the scheduler.
///
/// Holds the connection pool, not a connection: each invocation checks out
/// its own.
#[derive(Clone)]
pub struct AppState {
    /// Validated configuration with credentials loaded.
    pub config: Arc<GlobalConfig>,
    /// `SQLite` pool.
    pub db: Arc<Database>,
    /// Outbound platform channel.
    pub channel: Arc<dyn DeliveryChannel>,
}

impl AppState {
    /// Bundle the shared pieces.
    #[must_use]
    pub fn new(
        config: Arc<GlobalConfig>,
        db: Arc<Database>,
        channel: Arc<dyn DeliveryChannel>,
    ) -> Self {
        Self {
            config,
            db,
            channel,
        }
    }

    /// Conversation handler for webhook invocations.
    #[must_use]
    pub fn conversation(&self) -> Conversation {
        Conversation::new(
            Arc::clone(&self.config),
            Arc::clone(&self.db),
            Arc::clone(&self.channel),
        )
    }

    /// Broadcast task for scheduled invocations.
    #[must_use]
    pub fn broadcast_task(&self) -> BroadcastTask {
        BroadcastTask::new(
            Arc::clone(&self.db),
            Arc::clone(&self.channel),
            (&self.config.selection).into(),
            self.config.broadcast.local_hour,
        )
    }

    /// Page settings derived from the content config.
    #[must_use]
    pub fn page_settings(&self) -> PageSettings {
        PageSettings {
            greeting_text: self.config.content.greeting_text.clone(),
            get_started_payload: START_PAYLOAD.to_owned(),
            menu: vec![(
                self.config.content.menu_title.clone(),
                JOKE_PAYLOAD.to_owned(),
            )],
        }
    }
}
