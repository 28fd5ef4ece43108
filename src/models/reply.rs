//! Outbound reply payloads.

use serde::{Deserialize, Serialize};

/// Postback payload that requests a joke.
pub const JOKE_PAYLOAD: &str = "joke";
/// Postback payload of the "Get Started" button.
pub const START_PAYLOAD: &str = "start";

/// A postback button shown under a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Button {
    /// Visible label.
    pub label: String,
    /// Payload posted back when pressed.
    pub payload: String,
}

impl Button {
    /// Construct a postback button.
    #[must_use]
    pub fn postback(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

/// Platform-neutral reply shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplyPayload {
    /// Plain text.
    Text {
        /// Message body.
        body: String,
    },
    /// A single image by URL.
    Image {
        /// Image location.
        url: String,
    },
    /// Text with ordered postback buttons.
    ButtonCarousel {
        /// Message body.
        body: String,
        /// Buttons in display order.
        buttons: Vec<Button>,
    },
}

impl ReplyPayload {
    /// Plain-text reply.
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text { body: body.into() }
    }

    /// Image reply.
    #[must_use]
    pub fn image(url: impl Into<String>) -> Self {
        Self::Image { url: url.into() }
    }

    /// Text with a single postback button.
    #[must_use]
    pub fn single_button(body: impl Into<String>, button: Button) -> Self {
        Self::ButtonCarousel {
            body: body.into(),
            buttons: vec![button],
        }
    }
}

/// A reply addressed to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    /// Page-scoped recipient id.
    pub recipient: String,
    /// What to send.
    pub payload: ReplyPayload,
}

impl OutboundReply {
    /// Address `payload` to `recipient`.
    #[must_use]
    pub fn new(recipient: impl Into<String>, payload: ReplyPayload) -> Self {
        Self {
            recipient: recipient.into(),
            payload,
        }
    }
}
