//! HTTP surface: Messenger webhook and liveness check.
//!
//! `GET /webhook` answers the platform's subscription handshake, and with
//! `init` set pushes the page settings. `POST /webhook` runs the
//! conversation handler over every event in the body.

use std::net::SocketAddr;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use crate::bot::intent::classify;
use crate::messenger::webhook::WebhookPayload;
use crate::models::event::{InboundEvent, Intent};
use crate::state::AppState;
use crate::{AppError, Result};

/// Body returned on a verify-token mismatch.
pub const WRONG_TOKEN: &str = "Error, wrong validation token";

const SUCCESS: &str = "Success";

/// Query string of `GET /webhook`.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookQuery {
    /// `subscribe` during the handshake.
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    /// Token the platform echoes back.
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    /// Value to echo on success.
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
    /// Present to trigger page setup.
    pub init: Option<String>,
}

async fn health() -> &'static str {
    "ok"
}

/// Build the application router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", get(verify).post(receive))
        .route("/health", get(health))
        .with_state(state)
}

async fn verify(State(state): State<AppState>, Query(query): Query<WebhookQuery>) -> Response {
    let token = query.verify_token.unwrap_or_default();
    let expected = &state.config.messenger.verify_token;

    if query.init.is_some() {
        if expected.is_empty() || token != *expected {
            warn!("page setup refused: wrong verify token");
            return (StatusCode::FORBIDDEN, WRONG_TOKEN).into_response();
        }
        return init_page(&state)
            .instrument(info_span!("init_page"))
            .await;
    }

    let event = InboundEvent::VerificationChallenge {
        token,
        challenge: query.challenge.unwrap_or_default(),
    };
    match classify(&event, expected) {
        Intent::VerifyOk(challenge) => match challenge.trim().parse::<i64>() {
            Ok(value) => {
                info!(mode = query.mode.as_deref(), "webhook verified");
                (StatusCode::OK, value.to_string()).into_response()
            }
            Err(_) => (StatusCode::BAD_REQUEST, "challenge must be an integer").into_response(),
        },
        _ => {
            warn!("webhook verification failed");
            (StatusCode::FORBIDDEN, WRONG_TOKEN).into_response()
        }
    }
}

async fn init_page(state: &AppState) -> Response {
    match state.channel.configure_page(&state.page_settings()).await {
        Ok(()) => (StatusCode::OK, SUCCESS).into_response(),
        Err(err) => {
            error!(%err, "page setup failed");
            error_response(&err)
        }
    }
}

async fn receive(State(state): State<AppState>, body: String) -> Response {
    let outcome = handle_body(&state, &body)
        .instrument(info_span!("webhook"))
        .await;

    match outcome {
        Ok(delivered) => {
            info!(delivered, "webhook handled");
            (StatusCode::OK, SUCCESS).into_response()
        }
        Err(err) => {
            error!(%err, "webhook handling failed");
            error_response(&err)
        }
    }
}

async fn handle_body(state: &AppState, body: &str) -> Result<usize> {
    let events = serde_json::from_str::<WebhookPayload>(body)?.into_events();
    state.conversation().process(&events).await
}

fn error_response(err: &AppError) -> Response {
    let status = match err {
        AppError::Webhook(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string()).into_response()
}

/// Serve the router on `http_port` until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Config` if the port cannot be bound, or `AppError::Io`
/// if the server fails.
pub async fn serve(state: AppState, ct: CancellationToken) -> Result<()> {
    let bind = SocketAddr::from(([0, 0, 0, 0], state.config.http_port));
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Config(format!("failed to bind webhook server on {bind}: {err}")))?;

    info!(%bind, "webhook server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Io(format!("webhook server error: {err}")))?;

    info!("webhook server shut down");
    Ok(())
}
