//! Integration tests for the Graph API client against a local fake.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use cheeseday::config::MessengerConfig;
use cheeseday::messenger::client::GraphApiClient;
use cheeseday::messenger::{DeliveryChannel, MessagingType, PageSettings};
use cheeseday::models::reply::{Button, ReplyPayload};
use cheeseday::AppError;

/// One request seen by the fake: path, query and JSON body.
type Captured = Arc<Mutex<Vec<(String, HashMap<String, String>, Value)>>>;

async fn messages(
    State(seen): State<Captured>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let blocked = body["recipient"]["id"] == "blocked";
    seen.lock()
        .unwrap()
        .push(("me/messages".into(), query, body));
    if blocked {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": { "message": "user blocked the page" } })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({ "recipient_id": "u1", "message_id": "mid.1" })),
    )
}

async fn profile_settings(
    State(seen): State<Captured>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    seen.lock()
        .unwrap()
        .push(("me/messenger_profile".into(), query, body));
    Json(json!({ "result": "success" }))
}

async fn user_profile(
    State(seen): State<Captured>,
    Path(psid): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    seen.lock()
        .unwrap()
        .push((psid.clone(), query, Value::Null));
    Json(json!({ "first_name": "Ann", "timezone": -3, "id": psid }))
}

async fn spawn_fake() -> (GraphApiClient, Captured, CancellationToken) {
    let seen: Captured = Arc::default();
    let app = Router::new()
        .route("/v1/me/messages", post(messages))
        .route("/v1/me/messenger_profile", post(profile_settings))
        .route("/v1/{psid}", get(user_profile))
        .with_state(Arc::clone(&seen));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral");
    let addr = listener.local_addr().expect("local addr");
    let ct = CancellationToken::new();
    let server_ct = ct.clone();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_ct.cancelled().await })
            .await;
    });

    let config = MessengerConfig {
        graph_api_base: format!("http://{addr}/v1/"),
        page_access_token: "page-token".into(),
        verify_token: String::new(),
    };
    let client = GraphApiClient::new(&config).expect("client");
    (client, seen, ct)
}

#[test]
fn missing_token_is_a_config_error() {
    let err = GraphApiClient::new(&MessengerConfig::default())
        .err()
        .expect("token required");
    assert!(matches!(err, AppError::Config(_)));
}

#[tokio::test]
async fn send_posts_button_template_with_token() {
    let (client, seen, ct) = spawn_fake().await;

    let reply = ReplyPayload::single_button("Why?", Button::postback("Tell me", "12"));
    client
        .send("u1", &reply, MessagingType::Update)
        .await
        .expect("send");

    let seen = seen.lock().unwrap();
    let (path, query, body) = &seen[0];
    assert_eq!(path, "me/messages");
    assert_eq!(query.get("access_token").map(String::as_str), Some("page-token"));
    assert_eq!(body["messaging_type"], "UPDATE");
    assert_eq!(body["recipient"]["id"], "u1");
    let payload = &body["message"]["attachment"]["payload"];
    assert_eq!(payload["template_type"], "button");
    assert_eq!(payload["text"], "Why?");
    assert_eq!(payload["buttons"][0]["payload"], "12");

    ct.cancel();
}

#[tokio::test]
async fn rejected_send_is_a_delivery_error() {
    let (client, _seen, ct) = spawn_fake().await;

    let err = client
        .send("blocked", &ReplyPayload::text("hi"), MessagingType::Response)
        .await
        .expect_err("rejected");
    assert!(matches!(err, AppError::Delivery(ref msg) if msg.contains("400")));

    ct.cancel();
}

#[tokio::test]
async fn user_profile_requests_timezone() {
    let (client, seen, ct) = spawn_fake().await;

    let profile = client.user_profile("psid-7").await.expect("profile");
    assert_eq!(profile["timezone"], -3);

    let seen = seen.lock().unwrap();
    let (path, query, _) = &seen[0];
    assert_eq!(path, "psid-7");
    assert!(query
        .get("fields")
        .is_some_and(|fields| fields.split(',').any(|f| f == "timezone")));

    ct.cancel();
}

#[tokio::test]
async fn user_profile_keeps_sender_id_in_one_path_segment() {
    let (client, seen, ct) = spawn_fake().await;

    let profile = client.user_profile("a/b").await.expect("profile");
    assert_eq!(profile["id"], "a/b");

    let seen = seen.lock().unwrap();
    let (path, query, _) = &seen[0];
    assert_eq!(path, "a/b");
    assert_eq!(query.get("access_token").map(String::as_str), Some("page-token"));

    ct.cancel();
}

#[tokio::test]
async fn configure_page_posts_profile_settings() {
    let (client, seen, ct) = spawn_fake().await;

    let settings = PageSettings {
        greeting_text: "Hello cheese lovers".into(),
        get_started_payload: "start".into(),
        menu: vec![("Tell me a joke".into(), "joke".into())],
    };
    client.configure_page(&settings).await.expect("configure");

    let seen = seen.lock().unwrap();
    let (path, _, body) = &seen[0];
    assert_eq!(path, "me/messenger_profile");
    assert_eq!(body["get_started"]["payload"], "start");
    assert_eq!(body["greeting"][0]["text"], "Hello cheese lovers");

    ct.cancel();
}
