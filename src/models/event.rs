//! Inbound events and the intents they classify into.

/// A single inbound event, already lifted out of the transport envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Webhook subscription handshake.
    VerificationChallenge {
        /// Token supplied by the caller.
        token: String,
        /// Value to echo back on success.
        challenge: String,
    },
    /// A message typed by the user. `text` is `None` for attachments and
    /// stickers.
    TextMessage {
        /// Page-scoped sender id.
        sender_id: String,
        /// Message body, if any.
        text: Option<String>,
    },
    /// A button press.
    Postback {
        /// Page-scoped sender id.
        sender_id: String,
        /// Payload attached to the pressed button.
        payload: String,
    },
}

impl InboundEvent {
    /// Sender of a chat event; `None` for verification challenges.
    #[must_use]
    pub fn sender_id(&self) -> Option<&str> {
        match self {
            Self::VerificationChallenge { .. } => None,
            Self::TextMessage { sender_id, .. } | Self::Postback { sender_id, .. } => {
                Some(sender_id.as_str())
            }
        }
    }
}

/// Closed set of things an inbound event can ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Verification token matched; echo the challenge.
    VerifyOk(String),
    /// Verification token did not match.
    VerifyFailed,
    /// "Get Started" pressed: subscribe and welcome.
    Onboard,
    /// Send a random joke.
    RequestJoke,
    /// Reveal the answer to the joke with this id.
    RevealAnswer(i64),
    /// Free text that isn't about jokes.
    Fallback,
    /// Nothing to do.
    Ignore,
}
