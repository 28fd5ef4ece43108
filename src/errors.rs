//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Persistence failure when interacting with `SQLite` (store unavailable).
    Db(String),
    /// Selection found no eligible joke.
    NoContentAvailable(String),
    /// Messenger Send API or Graph API call rejected or unreachable.
    Delivery(String),
    /// Requested entity does not exist.
    NotFound(String),
    /// Inbound webhook body could not be understood.
    Webhook(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Db(msg) => write!(f, "db: {msg}"),
            Self::NoContentAvailable(msg) => write!(f, "no content available: {msg}"),
            Self::Delivery(msg) => write!(f, "delivery: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Webhook(msg) => write!(f, "webhook: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::Delivery(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Webhook(format!("invalid json: {err}"))
    }
}
