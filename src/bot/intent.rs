//! Inbound event classification.
//!
//! Pure and total: every event maps to exactly one [`Intent`], and anything
//! unrecognised maps to [`Intent::Ignore`] rather than an error.

use crate::models::event::{InboundEvent, Intent};
use crate::models::reply::{JOKE_PAYLOAD, START_PAYLOAD};

/// Substrings that turn free text into a joke request.
pub const JOKE_TRIGGERS: [&str; 3] = ["joke", "cheese-me", "cheese"];

/// Classify one inbound event against the configured verify token.
#[must_use]
pub fn classify(event: &InboundEvent, verify_token: &str) -> Intent {
    match event {
        InboundEvent::VerificationChallenge { token, challenge } => {
            if !verify_token.is_empty() && token == verify_token {
                Intent::VerifyOk(challenge.clone())
            } else {
                Intent::VerifyFailed
            }
        }
        InboundEvent::TextMessage { text: None, .. } => Intent::Ignore,
        InboundEvent::TextMessage {
            text: Some(text), ..
        } => classify_text(text),
        InboundEvent::Postback { payload, .. } => classify_postback(payload),
    }
}

fn classify_text(text: &str) -> Intent {
    let lowered = text.to_lowercase();
    if JOKE_TRIGGERS.iter().any(|trigger| lowered.contains(trigger)) {
        Intent::RequestJoke
    } else {
        Intent::Fallback
    }
}

fn classify_postback(payload: &str) -> Intent {
    match payload {
        START_PAYLOAD => Intent::Onboard,
        JOKE_PAYLOAD => Intent::RequestJoke,
        _ => parse_joke_id(payload).map_or(Intent::Ignore, Intent::RevealAnswer),
    }
}

/// Parse a digits-only payload. Signs, whitespace and values that overflow
/// `i64` are rejected.
fn parse_joke_id(payload: &str) -> Option<i64> {
    if payload.is_empty() || !payload.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    payload.parse().ok()
}
