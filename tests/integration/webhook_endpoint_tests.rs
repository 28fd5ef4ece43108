//! Integration tests for the HTTP webhook surface.
//!
//! Serves the router on an ephemeral port and talks to it over a real
//! socket.

use tokio_util::sync::CancellationToken;

use cheeseday::models::reply::ReplyPayload;
use cheeseday::server::{self, WRONG_TOKEN};
use cheeseday::state::AppState;

use super::test_helpers::{seed_jokes, test_config, test_state, VERIFY_TOKEN};

/// Spawn the router on an ephemeral port, returning its base URL.
///
/// Caller must cancel `ct` to shut the server down.
async fn spawn_server(state: AppState) -> (String, CancellationToken) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral");
    let addr = listener.local_addr().expect("local addr");

    let ct = CancellationToken::new();
    let server_ct = ct.clone();
    tokio::spawn(async move {
        let _ = axum::serve(listener, server::router(state))
            .with_graceful_shutdown(async move { server_ct.cancelled().await })
            .await;
    });

    (format!("http://{addr}"), ct)
}

#[tokio::test]
async fn health_returns_ok() {
    let (state, _channel) = test_state(test_config()).await;
    let (base, ct) = spawn_server(state).await;

    let resp = reqwest::get(format!("{base}/health")).await.expect("request");
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.expect("body"), "ok");

    ct.cancel();
}

#[tokio::test]
async fn verification_echoes_challenge() {
    let (state, _channel) = test_state(test_config()).await;
    let (base, ct) = spawn_server(state).await;

    let url = format!(
        "{base}/webhook?hub.mode=subscribe&hub.verify_token={VERIFY_TOKEN}&hub.challenge=1158201444"
    );
    let resp = reqwest::get(url).await.expect("request");
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.expect("body"), "1158201444");

    ct.cancel();
}

#[tokio::test]
async fn verification_with_wrong_token_is_forbidden() {
    let (state, _channel) = test_state(test_config()).await;
    let (base, ct) = spawn_server(state).await;

    let url = format!("{base}/webhook?hub.mode=subscribe&hub.verify_token=nope&hub.challenge=1");
    let resp = reqwest::get(url).await.expect("request");
    assert_eq!(resp.status(), 403);
    assert_eq!(resp.text().await.expect("body"), WRONG_TOKEN);

    ct.cancel();
}

#[tokio::test]
async fn non_integer_challenge_is_bad_request() {
    let (state, _channel) = test_state(test_config()).await;
    let (base, ct) = spawn_server(state).await;

    let url = format!("{base}/webhook?hub.verify_token={VERIFY_TOKEN}&hub.challenge=abc");
    let resp = reqwest::get(url).await.expect("request");
    assert_eq!(resp.status(), 400);

    ct.cancel();
}

#[tokio::test]
async fn init_pushes_page_settings() {
    let (state, channel) = test_state(test_config()).await;
    let (base, ct) = spawn_server(state).await;

    let resp = reqwest::get(format!("{base}/webhook?init=1&hub.verify_token={VERIFY_TOKEN}"))
        .await
        .expect("request");
    assert_eq!(resp.status(), 200);

    let pages = channel.pages();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].get_started_payload, "start");
    assert_eq!(
        pages[0].menu,
        vec![("Tell me a joke".to_owned(), "joke".to_owned())]
    );

    ct.cancel();
}

#[tokio::test]
async fn init_without_token_is_refused() {
    let (state, channel) = test_state(test_config()).await;
    let (base, ct) = spawn_server(state).await;

    let resp = reqwest::get(format!("{base}/webhook?init=1"))
        .await
        .expect("request");
    assert_eq!(resp.status(), 403);
    assert!(channel.pages().is_empty());

    ct.cancel();
}

#[tokio::test]
async fn post_handles_events_and_reports_success() {
    let (state, channel) = test_state(test_config()).await;
    let jokes = seed_jokes(&state.db, 1).await;
    let (base, ct) = spawn_server(state).await;

    let body = format!(
        r#"{{"object":"page","entry":[{{"id":"p","time":1,"messaging":[
            {{"sender":{{"id":"u1"}},"recipient":{{"id":"p"}},"postback":{{"payload":"{id}"}}}},
            {{"sender":{{"id":"p"}},"recipient":{{"id":"u1"}},"message":{{"is_echo":true,"text":"joke"}}}}
        ]}}]}}"#,
        id = jokes[0].id
    );
    let resp = reqwest::Client::new()
        .post(format!("{base}/webhook"))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.expect("body"), "Success");

    let payloads: Vec<ReplyPayload> = channel.sent().into_iter().map(|s| s.payload).collect();
    assert_eq!(
        payloads,
        vec![
            ReplyPayload::image(jokes[0].answer_image_url.clone()),
            ReplyPayload::text(jokes[0].answer.clone()),
        ]
    );

    ct.cancel();
}

#[tokio::test]
async fn post_failure_returns_error_string() {
    let (state, _channel) = test_state(test_config()).await;
    let (base, ct) = spawn_server(state).await;

    let body = r#"{"object":"page","entry":[{"messaging":[
        {"sender":{"id":"u1"},"message":{"text":"cheese"}}
    ]}]}"#;
    let resp = reqwest::Client::new()
        .post(format!("{base}/webhook"))
        .body(body)
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 500);
    assert!(resp
        .text()
        .await
        .expect("body")
        .starts_with("no content available"));

    ct.cancel();
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let (state, _channel) = test_state(test_config()).await;
    let (base, ct) = spawn_server(state).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/webhook"))
        .body("{not json")
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 400);
    assert!(resp.text().await.expect("body").starts_with("webhook:"));

    ct.cancel();
}
