//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::{AppError, Result};

const KEYRING_SERVICE: &str = "cheeseday";

/// Messenger Platform connectivity settings.
///
/// Tokens are loaded at runtime via OS keychain or environment variables,
/// never from the TOML config file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct MessengerConfig {
    /// Base URL of the Graph API, including the version segment.
    #[serde(default = "default_graph_api_base")]
    pub graph_api_base: String,
    /// Page access token used for the Send API (populated at runtime).
    #[serde(skip)]
    pub page_access_token: String,
    /// Shared secret echoed back by the platform during webhook verification
    /// (populated at runtime).
    #[serde(skip)]
    pub verify_token: String,
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            graph_api_base: default_graph_api_base(),
            page_access_token: String::new(),
            verify_token: String::new(),
        }
    }
}

fn default_graph_api_base() -> String {
    "https://graph.facebook.com/v19.0".into()
}

/// Daily broadcast settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct BroadcastConfig {
    /// Whether `serve` runs the hourly broadcast scheduler.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Local wall-clock hour at which subscribers receive the joke.
    #[serde(default = "default_local_hour")]
    pub local_hour: u32,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            local_hour: default_local_hour(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_local_hour() -> u32 {
    9
}

/// How a broadcast joke becomes eligible again after it was sent.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// A joke is broadcast at most once, ever.
    NeverRepeat,
    /// A joke rejoins the pool once `rotation_months` have passed.
    #[default]
    MonthlyRotation,
}

/// Content selection settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SelectionConfig {
    /// Consumption policy applied to unique (broadcast) selection.
    #[serde(default)]
    pub policy: PolicyKind,
    /// Rotation window in calendar months for `monthly_rotation`.
    #[serde(default = "default_rotation_months")]
    pub rotation_months: u32,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::default(),
            rotation_months: default_rotation_months(),
        }
    }
}

fn default_rotation_months() -> u32 {
    1
}

/// Copy and assets used in replies and page setup.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ContentConfig {
    /// Image sent before the onboarding message.
    #[serde(default = "default_onboarding_image_url")]
    pub onboarding_image_url: String,
    /// Greeting shown on the page before the conversation starts.
    #[serde(default = "default_greeting_text")]
    pub greeting_text: String,
    /// Title of the persistent menu entry that requests a joke.
    #[serde(default = "default_menu_title")]
    pub menu_title: String,
    /// Title of the button attached to the onboarding message.
    #[serde(default = "default_onboarding_button")]
    pub onboarding_button: String,
    /// In-character replies to messages that don't ask for a joke.
    #[serde(default = "default_fallback_messages")]
    pub fallback_messages: Vec<String>,
    /// Welcome messages; one is picked at random per onboarding.
    #[serde(default = "default_onboarding_messages")]
    pub onboarding_messages: Vec<String>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            onboarding_image_url: default_onboarding_image_url(),
            greeting_text: default_greeting_text(),
            menu_title: default_menu_title(),
            onboarding_button: default_onboarding_button(),
            fallback_messages: default_fallback_messages(),
            onboarding_messages: default_onboarding_messages(),
        }
    }
}

fn default_onboarding_image_url() -> String {
    "https://s3-eu-west-1.amazonaws.com/cheeseday/halloumi-sm.jpg".into()
}

fn default_greeting_text() -> String {
    "Mornings are the worst. Make \u{2018}em better with a daily, cheesy joke.".into()
}

fn default_menu_title() -> String {
    "Tell me a joke".into()
}

fn default_onboarding_button() -> String {
    "Cheese-me".into()
}

fn default_fallback_messages() -> Vec<String> {
    vec![
        "What\u{2019}s that? Doesn\u{2019}t matter. Let\u{2019}s crack on with the cheese.".into(),
        "I camembert to talk about anything but cheese. Let\u{2019}s get back to the good stuff."
            .into(),
        "That doesn\u{2019}t sound like a cheese joke to me. Let\u{2019}s get back to the good stuff."
            .into(),
        "You\u{2019}ve got a whey with words, but I do the jokes round here. \
         Click \u{201c}cheese-me\u{201d} for more of the good stuff."
            .into(),
    ]
}

fn default_onboarding_messages() -> Vec<String> {
    vec![
        "The best jokes are cheese jokes. Get a slice of un-brie-lievably cheesy humour in your \
         inbox every morning. Can\u{2019}t wait \u{2018}til then? Just click \u{201c}cheese-me\u{201d} \
         whenever you need a fix. \u{1f9c0}"
            .into(),
        "Let\u{2019}s make mornings grate again. \u{1f9c0}".into(),
    ]
}

fn default_http_port() -> u16 {
    3000
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data").join("cheeseday.db")
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// HTTP port for the webhook server.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// `SQLite` database file.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Messenger Platform connectivity settings.
    #[serde(default)]
    pub messenger: MessengerConfig,
    /// Daily broadcast settings.
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    /// Content selection policy.
    #[serde(default)]
    pub selection: SelectionConfig,
    /// Reply copy and assets.
    #[serde(default)]
    pub content: ContentConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load Messenger credentials from OS keychain with env-var fallback.
    ///
    /// Tries the `cheeseday` keyring service first, then falls back to
    /// `MESSENGER_PAGE_ACCESS_TOKEN` / `MESSENGER_VERIFY_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if neither keychain nor env vars provide
    /// the required tokens.
    pub async fn load_credentials(&mut self) -> Result<()> {
        self.messenger.page_access_token =
            load_credential("page_access_token", "MESSENGER_PAGE_ACCESS_TOKEN").await?;
        self.messenger.verify_token =
            load_credential("verify_token", "MESSENGER_VERIFY_TOKEN").await?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.broadcast.local_hour > 23 {
            return Err(AppError::Config(
                "broadcast.local_hour must be between 0 and 23".into(),
            ));
        }

        if self.selection.rotation_months == 0 {
            return Err(AppError::Config(
                "selection.rotation_months must be greater than zero".into(),
            ));
        }

        if self.content.onboarding_image_url.trim().is_empty() {
            return Err(AppError::Config(
                "content.onboarding_image_url must not be empty".into(),
            ));
        }

        if self.content.fallback_messages.is_empty() {
            return Err(AppError::Config(
                "content.fallback_messages must not be empty".into(),
            ));
        }

        if self.content.onboarding_messages.is_empty() {
            return Err(AppError::Config(
                "content.onboarding_messages must not be empty".into(),
            ));
        }

        Ok(())
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    let key = keyring_key.to_owned();

    // keyring is synchronous I/O.
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    env::var(env_key)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            AppError::Config(format!(
                "credential {keyring_key} not found in keychain or {env_key} env var"
            ))
        })
}
