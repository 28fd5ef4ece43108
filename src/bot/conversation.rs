//! Conversation handling for webhook invocations.
//!
//! Each webhook call is classified event by event; the replies for an event
//! are built first and then delivered one at a time, each awaited before the
//! next, so an answer image always lands before its caption.

use std::sync::Arc;

use chrono::Utc;
use rand::seq::SliceRandom;
use serde_json::Value;
use sqlx::SqliteConnection;
use tracing::{debug, error, info, warn};

use crate::bot::intent::classify;
use crate::bot::selector::{ContentSelector, Uniqueness};
use crate::config::GlobalConfig;
use crate::messenger::{DeliveryChannel, MessagingType};
use crate::models::event::{InboundEvent, Intent};
use crate::models::joke::Joke;
use crate::models::reply::{Button, OutboundReply, ReplyPayload, JOKE_PAYLOAD};
use crate::models::user::User;
use crate::persistence::db::{self, Database};
use crate::persistence::joke_repo::JokeRepo;
use crate::persistence::user_repo::UserRepo;
use crate::{AppError, Result};

/// The joke card: set-up text with one button that reveals the answer.
#[must_use]
pub fn joke_card(joke: &Joke) -> ReplyPayload {
    ReplyPayload::single_button(
        joke.prompt.clone(),
        Button::postback(joke.button_label.clone(), joke.id.to_string()),
    )
}

/// Turns classified intents into replies and delivers them.
#[derive(Clone)]
pub struct Conversation {
    config: Arc<GlobalConfig>,
    db: Arc<Database>,
    channel: Arc<dyn DeliveryChannel>,
    selector: ContentSelector,
}

impl Conversation {
    /// Create a handler.
    #[must_use]
    pub fn new(
        config: Arc<GlobalConfig>,
        db: Arc<Database>,
        channel: Arc<dyn DeliveryChannel>,
    ) -> Self {
        let selector = ContentSelector::new((&config.selection).into());
        Self {
            config,
            db,
            channel,
            selector,
        }
    }

    /// Handle one webhook batch on a single connection checked out for this
    /// invocation. Returns the number of replies delivered.
    ///
    /// # Errors
    ///
    /// Returns the first store or delivery failure; events after it are not
    /// processed.
    pub async fn process(&self, events: &[InboundEvent]) -> Result<usize> {
        let mut conn = db::acquire(&self.db).await?;
        let mut delivered = 0;
        for event in events {
            delivered += self.respond(&mut conn, event).await?.len();
        }
        Ok(delivered)
    }

    /// Classify, handle and deliver one event. Returns the delivered replies.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db`, `AppError::NoContentAvailable` or
    /// `AppError::Delivery`.
    pub async fn respond(
        &self,
        conn: &mut SqliteConnection,
        event: &InboundEvent,
    ) -> Result<Vec<OutboundReply>> {
        let Some(sender_id) = event.sender_id() else {
            return Ok(Vec::new());
        };
        let intent = classify(event, &self.config.messenger.verify_token);
        debug!(sender_id, ?intent, "classified event");

        let replies = self.handle(conn, intent, sender_id).await?;
        self.deliver(&replies).await?;
        Ok(replies)
    }

    /// Build the replies for `intent` from `sender_id`, in delivery order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the store fails, or
    /// `AppError::NoContentAvailable` if a joke is requested from an empty
    /// store.
    pub async fn handle(
        &self,
        conn: &mut SqliteConnection,
        intent: Intent,
        sender_id: &str,
    ) -> Result<Vec<OutboundReply>> {
        let payloads = match intent {
            Intent::Onboard => self.onboard(conn, sender_id).await,
            Intent::RequestJoke => {
                let joke = self
                    .selector
                    .pick(conn, Uniqueness::RepeatsAllowed, Utc::now())
                    .await?;
                vec![joke_card(&joke)]
            }
            Intent::RevealAnswer(id) => match JokeRepo::new(conn).get_by_id(id).await {
                Ok(joke) => vec![
                    ReplyPayload::image(joke.answer_image_url),
                    ReplyPayload::text(joke.answer),
                ],
                Err(AppError::NotFound(_)) => {
                    info!(joke_id = id, sender_id, "reveal for unknown joke ignored");
                    Vec::new()
                }
                Err(err) => return Err(err),
            },
            Intent::Fallback => vec![ReplyPayload::text(pick_line(
                &self.config.content.fallback_messages,
            ))],
            Intent::Ignore | Intent::VerifyFailed | Intent::VerifyOk(_) => Vec::new(),
        };

        Ok(payloads
            .into_iter()
            .map(|payload| OutboundReply::new(sender_id, payload))
            .collect())
    }

    /// Deliver replies strictly in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Delivery` from the failing send.
    pub async fn deliver(&self, replies: &[OutboundReply]) -> Result<()> {
        for reply in replies {
            if let Err(err) = self
                .channel
                .send(&reply.recipient, &reply.payload, MessagingType::Response)
                .await
            {
                error!(%err, recipient = %reply.recipient, "reply delivery failed");
                return Err(err);
            }
        }
        Ok(())
    }

    /// Subscribe the sender, then welcome them. Subscription problems are
    /// logged and never stop the welcome.
    async fn onboard(&self, conn: &mut SqliteConnection, sender_id: &str) -> Vec<ReplyPayload> {
        match self.subscribe(conn, sender_id).await {
            Ok(true) => info!(sender_id, "subscriber created"),
            Ok(false) => debug!(sender_id, "subscriber already registered"),
            Err(err) => warn!(%err, sender_id, "failed to persist subscriber"),
        }

        let content = &self.config.content;
        vec![
            ReplyPayload::image(content.onboarding_image_url.clone()),
            ReplyPayload::single_button(
                pick_line(&content.onboarding_messages),
                Button::postback(content.onboarding_button.clone(), JOKE_PAYLOAD),
            ),
        ]
    }

    async fn subscribe(&self, conn: &mut SqliteConnection, sender_id: &str) -> Result<bool> {
        let mut users = UserRepo::new(conn);
        if users.get(sender_id).await?.is_some() {
            return Ok(false);
        }

        let profile = match self.channel.user_profile(sender_id).await {
            Ok(profile) => profile,
            Err(err) => {
                warn!(%err, sender_id, "profile lookup failed; subscribing at UTC+0");
                Value::Null
            }
        };
        let user = User::from_profile(sender_id, profile);
        users.ensure(&user).await
    }
}

/// Uniform choice over a configured message set (validated non-empty).
fn pick_line(lines: &[String]) -> String {
    lines
        .choose(&mut rand::thread_rng())
        .cloned()
        .unwrap_or_default()
}
