//! Messenger Platform bridge.
//!
//! The [`DeliveryChannel`] trait decouples the conversation and broadcast
//! logic from the Graph API so that both can run against a recording double
//! in tests.

pub mod client;
pub mod templates;
pub mod webhook;

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::models::reply::ReplyPayload;
use crate::Result;

/// Boxed future returned by [`DeliveryChannel`] methods.
pub type DeliveryFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Why a message is being sent; maps to the Send API `messaging_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagingType {
    /// Reply to something the user just did.
    Response,
    /// Proactive message such as the daily broadcast.
    Update,
}

impl MessagingType {
    /// Wire value for the Send API.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Response => "RESPONSE",
            Self::Update => "UPDATE",
        }
    }
}

/// One-time page configuration pushed by the administrative init trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSettings {
    /// Greeting shown before the conversation starts.
    pub greeting_text: String,
    /// Payload of the "Get Started" button.
    pub get_started_payload: String,
    /// Persistent menu entries as `(title, payload)`.
    pub menu: Vec<(String, String)>,
}

/// Outbound side of the chat platform.
pub trait DeliveryChannel: Send + Sync {
    /// Deliver one reply to one recipient.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Delivery`](crate::AppError::Delivery) if the
    /// platform rejects the message or cannot be reached.
    fn send<'a>(
        &'a self,
        recipient: &'a str,
        reply: &'a ReplyPayload,
        messaging_type: MessagingType,
    ) -> DeliveryFuture<'a, ()>;

    /// Fetch the public profile of a user.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Delivery`](crate::AppError::Delivery) if the
    /// lookup fails.
    fn user_profile<'a>(&'a self, user_id: &'a str) -> DeliveryFuture<'a, Value>;

    /// Push greeting, get-started button and persistent menu.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Delivery`](crate::AppError::Delivery) if the
    /// platform rejects the settings.
    fn configure_page<'a>(&'a self, settings: &'a PageSettings) -> DeliveryFuture<'a, ()>;
}
