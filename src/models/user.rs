//! Subscriber model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Offsets outside this range do not exist on Earth; profiles reporting
/// them are clamped.
pub const MIN_UTC_OFFSET: i32 = -12;
/// See [`MIN_UTC_OFFSET`].
pub const MAX_UTC_OFFSET: i32 = 14;

/// A subscribed Messenger user. Created once on "Get Started" and never
/// updated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Page-scoped sender id.
    pub id: String,
    /// Whole-hour UTC offset captured from the platform profile.
    pub timezone_offset_hours: i32,
    /// Remaining profile attributes, stored as delivered by the platform.
    pub profile: Value,
    /// Subscription timestamp.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build a subscriber from a platform profile document.
    ///
    /// The `timezone` field may be fractional (e.g. `5.5`); it is rounded to
    /// the nearest hour. A missing or non-numeric `timezone` yields offset 0.
    /// The `id` field, if the platform echoes one, is not duplicated into the
    /// stored profile.
    #[must_use]
    pub fn from_profile(id: impl Into<String>, profile: Value) -> Self {
        let timezone_offset_hours = profile
            .get("timezone")
            .and_then(Value::as_f64)
            .map_or(0, offset_from_hours);

        let profile = match profile {
            Value::Object(mut map) => {
                map.remove("id");
                Value::Object(map)
            }
            Value::Null => Value::Object(serde_json::Map::new()),
            other => other,
        };

        Self {
            id: id.into(),
            timezone_offset_hours,
            profile,
            created_at: Utc::now(),
        }
    }
}

#[allow(clippy::cast_possible_truncation)] // clamped to -12..=14 before the cast
fn offset_from_hours(hours: f64) -> i32 {
    let clamped = hours
        .round()
        .clamp(f64::from(MIN_UTC_OFFSET), f64::from(MAX_UTC_OFFSET));
    clamped as i32
}
