//! Inbound webhook envelope.
//!
//! Messenger batches events: one POST carries one or more `entry` objects,
//! each with a `messaging` array. Only user-authored messages and postbacks
//! become [`InboundEvent`]s; echoes of the page's own messages, delivery
//! receipts and read receipts are dropped here so the bot never answers
//! itself.

use serde::Deserialize;
use tracing::debug;

use crate::models::event::InboundEvent;

const PAGE_OBJECT: &str = "page";

/// Top-level webhook body.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    /// Subscription object type; `page` for Messenger.
    pub object: String,
    /// Batched entries.
    #[serde(default)]
    pub entry: Vec<Entry>,
}

/// One entry of a webhook batch.
#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    /// Messaging events in delivery order.
    #[serde(default)]
    pub messaging: Vec<MessagingEvent>,
}

/// A raw messaging event.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagingEvent {
    /// Who triggered the event.
    pub sender: Participant,
    /// Present for message events.
    pub message: Option<InboundMessage>,
    /// Present for postback events.
    pub postback: Option<InboundPostback>,
}

/// Sender or recipient reference.
#[derive(Debug, Clone, Deserialize)]
pub struct Participant {
    /// Page-scoped id.
    pub id: String,
}

/// Message body of a message event.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    /// Text, absent for attachments and stickers.
    pub text: Option<String>,
    /// Set when the page itself sent the message.
    #[serde(default)]
    pub is_echo: bool,
}

/// Postback body.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundPostback {
    /// Payload of the pressed button.
    #[serde(default)]
    pub payload: String,
}

impl WebhookPayload {
    /// Flatten the batch into chat events, in delivery order.
    #[must_use]
    pub fn into_events(self) -> Vec<InboundEvent> {
        if self.object != PAGE_OBJECT {
            debug!(object = %self.object, "ignoring non-page webhook object");
            return Vec::new();
        }

        self.entry
            .into_iter()
            .flat_map(|entry| entry.messaging)
            .filter_map(MessagingEvent::into_event)
            .collect()
    }
}

impl MessagingEvent {
    fn into_event(self) -> Option<InboundEvent> {
        let sender_id = self.sender.id;
        if let Some(postback) = self.postback {
            return Some(InboundEvent::Postback {
                sender_id,
                payload: postback.payload,
            });
        }
        match self.message {
            Some(message) if message.is_echo => {
                debug!(sender_id, "dropping echo");
                None
            }
            Some(message) => Some(InboundEvent::TextMessage {
                sender_id,
                text: message.text,
            }),
            None => {
                debug!(sender_id, "dropping receipt or unsupported event");
                None
            }
        }
    }
}
