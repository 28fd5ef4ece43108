//! Graph API client implementing [`DeliveryChannel`].

use reqwest::{Client, Response, Url};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::MessengerConfig;
use crate::models::reply::ReplyPayload;
use crate::{AppError, Result};

use super::templates::{self, PROFILE_FIELDS};
use super::{DeliveryChannel, DeliveryFuture, MessagingType, PageSettings};

/// Thin wrapper over the Send, User Profile and Messenger Profile APIs.
#[derive(Clone)]
pub struct GraphApiClient {
    http: Client,
    base: String,
    access_token: String,
}

impl GraphApiClient {
    /// Create a client from Messenger settings with credentials loaded.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the page access token is missing.
    pub fn new(config: &MessengerConfig) -> Result<Self> {
        if config.page_access_token.is_empty() {
            return Err(AppError::Config("page access token is not loaded".into()));
        }
        Ok(Self {
            http: Client::new(),
            base: config.graph_api_base.trim_end_matches('/').to_owned(),
            access_token: config.page_access_token.clone(),
        })
    }

    /// Build `{base}/{segments...}?access_token=...`. Each segment is
    /// percent-encoded, so ids cannot escape their path position.
    fn endpoint(&self, segments: &[&str], extra: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&self.base)
            .map_err(|err| AppError::Config(format!("invalid graph api url: {err}")))?;
        url.path_segments_mut()
            .map_err(|()| AppError::Config(format!("graph api url has no path: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut()
            .append_pair("access_token", &self.access_token)
            .extend_pairs(extra);
        Ok(url)
    }

    async fn post_json(&self, segments: &[&str], body: &Value) -> Result<Value> {
        let url = self.endpoint(segments, &[])?;
        let response = self.http.post(url).json(body).send().await?;
        read_response(&segments.join("/"), response).await
    }
}

async fn read_response(path: &str, response: Response) -> Result<Value> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<Value>().await?);
    }
    let detail = response.text().await.unwrap_or_default();
    Err(AppError::Delivery(format!(
        "{path} returned {status}: {detail}"
    )))
}

impl DeliveryChannel for GraphApiClient {
    fn send<'a>(
        &'a self,
        recipient: &'a str,
        reply: &'a ReplyPayload,
        messaging_type: MessagingType,
    ) -> DeliveryFuture<'a, ()> {
        Box::pin(async move {
            let body = templates::send_request(recipient, reply, messaging_type);
            let response = self.post_json(&["me", "messages"], &body).await?;
            let message_id = response.get("message_id").and_then(serde_json::Value::as_str);
            debug!(recipient, message_id, "message delivered");
            Ok(())
        })
    }

    fn user_profile<'a>(&'a self, user_id: &'a str) -> DeliveryFuture<'a, Value> {
        Box::pin(async move {
            let url = self.endpoint(&[user_id], &[("fields", PROFILE_FIELDS)])?;
            let response = self.http.get(url).send().await?;
            read_response("user profile", response).await
        })
    }

    fn configure_page<'a>(&'a self, settings: &'a PageSettings) -> DeliveryFuture<'a, ()> {
        Box::pin(async move {
            let body = templates::profile_request(settings);
            let response = self.post_json(&["me", "messenger_profile"], &body).await?;
            info!(%response, "page settings updated");
            Ok(())
        })
    }
}
