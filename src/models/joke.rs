//! Joke content model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A joke row: prompt plus the answer revealed by the follow-up button.
///
/// `consumed_at` is the only field that changes after seeding; it records
/// the last time the joke went out in a broadcast.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Joke {
    /// Integer identifier, also used as the reveal postback payload.
    pub id: i64,
    /// Set-up line shown first.
    pub prompt: String,
    /// Label of the button that reveals the answer.
    pub button_label: String,
    /// Punchline text.
    pub answer: String,
    /// Image sent ahead of the punchline.
    pub answer_image_url: String,
    /// Last broadcast time, `None` if never broadcast.
    pub consumed_at: Option<DateTime<Utc>>,
}

/// Joke content used when seeding the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewJoke {
    /// Set-up line shown first.
    pub prompt: String,
    /// Label of the button that reveals the answer.
    pub button_label: String,
    /// Punchline text.
    pub answer: String,
    /// Image sent ahead of the punchline.
    pub answer_image_url: String,
}

impl NewJoke {
    /// Construct seed content.
    #[must_use]
    pub fn new(
        prompt: impl Into<String>,
        button_label: impl Into<String>,
        answer: impl Into<String>,
        answer_image_url: impl Into<String>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            button_label: button_label.into(),
            answer: answer.into(),
            answer_image_url: answer_image_url.into(),
        }
    }
}
