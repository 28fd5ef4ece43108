//! Send API and Messenger Profile API request builders.
//!
//! Turns platform-neutral [`ReplyPayload`]s into the JSON bodies the Graph
//! API expects.

use serde_json::{json, Value};

use crate::models::reply::{Button, ReplyPayload};

use super::{MessagingType, PageSettings};

/// Fields requested when looking up a user profile.
pub const PROFILE_FIELDS: &str = "first_name,last_name,profile_pic,locale,timezone,gender";

/// Build a Send API request body.
#[must_use]
pub fn send_request(
    recipient: &str,
    reply: &ReplyPayload,
    messaging_type: MessagingType,
) -> Value {
    json!({
        "messaging_type": messaging_type.as_str(),
        "recipient": { "id": recipient },
        "message": message(reply),
    })
}

/// Build the `message` object for a reply.
#[must_use]
pub fn message(reply: &ReplyPayload) -> Value {
    match reply {
        ReplyPayload::Text { body } => json!({ "text": body }),
        ReplyPayload::Image { url } => json!({
            "attachment": {
                "type": "image",
                "payload": { "url": url, "is_reusable": true },
            }
        }),
        ReplyPayload::ButtonCarousel { body, buttons } => json!({
            "attachment": {
                "type": "template",
                "payload": {
                    "template_type": "button",
                    "text": body,
                    "buttons": buttons.iter().map(postback_button).collect::<Vec<_>>(),
                },
            }
        }),
    }
}

fn postback_button(button: &Button) -> Value {
    json!({
        "type": "postback",
        "title": button.label,
        "payload": button.payload,
    })
}

/// Build a Messenger Profile API request body.
#[must_use]
pub fn profile_request(settings: &PageSettings) -> Value {
    let call_to_actions: Vec<Value> = settings
        .menu
        .iter()
        .map(|(title, payload)| {
            json!({ "type": "postback", "title": title, "payload": payload })
        })
        .collect();

    json!({
        "greeting": [{ "locale": "default", "text": settings.greeting_text }],
        "get_started": { "payload": settings.get_started_payload },
        "persistent_menu": [{
            "locale": "default",
            "composer_input_disabled": false,
            "call_to_actions": call_to_actions,
        }],
    })
}
