//! Integration tests for the scheduled broadcast.

use chrono::{DateTime, TimeZone, Utc};

use cheeseday::bot::broadcast::{BroadcastOutcome, BroadcastReport};
use cheeseday::messenger::MessagingType;
use cheeseday::persistence::db;
use cheeseday::persistence::joke_repo::{Eligibility, JokeRepo};

use super::test_helpers::{reload_joke, seed_jokes, seed_users, test_config, test_state};

fn utc(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 14, hour, 0, 0).unwrap()
}

fn completed(outcome: BroadcastOutcome) -> BroadcastReport {
    match outcome {
        BroadcastOutcome::Completed(report) => report,
        BroadcastOutcome::Failed(err) => panic!("broadcast failed: {err}"),
    }
}

#[tokio::test]
async fn only_the_matching_bucket_is_reached() {
    let (state, channel) = test_state(test_config()).await;
    let jokes = seed_jokes(&state.db, 1).await;
    seed_users(&state.db, &[("a", 0), ("b", 0), ("c", 9)]).await;

    let report = completed(state.broadcast_task().run(utc(9)).await);

    assert_eq!(report.recipients_sent, 2);
    assert_eq!(report.delivered, 2);
    assert_eq!(report.joke_id, Some(jokes[0].id));

    let sent = channel.sent();
    let mut recipients: Vec<&str> = sent.iter().map(|s| s.recipient.as_str()).collect();
    recipients.sort_unstable();
    assert_eq!(recipients, vec!["a", "b"]);
    assert!(sent.iter().all(|s| s.messaging_type == MessagingType::Update));
}

#[tokio::test]
async fn east_of_utc_gets_it_the_previous_utc_day() {
    let (state, channel) = test_state(test_config()).await;
    seed_jokes(&state.db, 1).await;
    seed_users(&state.db, &[("tokyo", 9), ("london", 0)]).await;

    let report = completed(state.broadcast_task().run(utc(0)).await);

    assert_eq!(report.recipients_sent, 1);
    assert_eq!(channel.sent()[0].recipient, "tokyo");
}

#[tokio::test]
async fn date_line_buckets_share_a_run() {
    let (state, _channel) = test_state(test_config()).await;
    seed_jokes(&state.db, 1).await;
    seed_users(&state.db, &[("samoa", -11), ("tonga", 13), ("nyc", -5)]).await;

    let report = completed(state.broadcast_task().run(utc(20)).await);
    assert_eq!(report.recipients_sent, 2);
}

#[tokio::test]
async fn no_recipients_consumes_nothing() {
    let (state, channel) = test_state(test_config()).await;
    let jokes = seed_jokes(&state.db, 1).await;
    seed_users(&state.db, &[("c", 9)]).await;

    let report = completed(state.broadcast_task().run(utc(9)).await);

    assert_eq!(report, BroadcastReport::default());
    assert!(channel.sent().is_empty());
    assert_eq!(reload_joke(&state.db, jokes[0].id).await.consumed_at, None);
}

#[tokio::test]
async fn failing_recipients_do_not_abort_fan_out() {
    let (state, channel) = test_state(test_config()).await;
    let jokes = seed_jokes(&state.db, 1).await;
    seed_users(&state.db, &[("a", 0), ("b", 0), ("c", 0)]).await;
    channel.fail_for("b");

    let now = utc(9);
    let report = completed(state.broadcast_task().run(now).await);

    assert_eq!(report.recipients_sent, 3);
    assert_eq!(report.delivered, 2);
    assert_eq!(channel.sent().len(), 3, "every recipient attempted");

    assert_eq!(reload_joke(&state.db, jokes[0].id).await.consumed_at, Some(now));
    let mut conn = db::acquire(&state.db).await.expect("conn");
    assert_eq!(
        JokeRepo::new(&mut conn)
            .count_eligible(Eligibility::NeverConsumed)
            .await
            .expect("count"),
        0,
        "consumed exactly once"
    );
}

#[tokio::test]
async fn nothing_unseen_skips_without_failure() {
    let (state, channel) = test_state(test_config()).await;
    seed_jokes(&state.db, 1).await;
    seed_users(&state.db, &[("a", 0)]).await;

    let first = completed(state.broadcast_task().run(utc(9)).await);
    assert_eq!(first.recipients_sent, 1);

    let next_day = Utc.with_ymd_and_hms(2024, 5, 15, 9, 0, 0).unwrap();
    let outcome = state.broadcast_task().run(next_day).await;
    assert_eq!(outcome.recipients_sent(), 0);
    assert_eq!(completed(outcome).joke_id, None);
    assert_eq!(channel.sent().len(), 1);
}

#[tokio::test]
async fn successive_broadcasts_pick_distinct_jokes() {
    let (state, _channel) = test_state(test_config()).await;
    seed_jokes(&state.db, 3).await;
    seed_users(&state.db, &[("a", 0)]).await;

    let mut picked = Vec::new();
    for day in 1..=3 {
        let now = Utc.with_ymd_and_hms(2024, 5, day, 9, 0, 0).unwrap();
        let report = completed(state.broadcast_task().run(now).await);
        picked.push(report.joke_id.expect("joke sent"));
    }
    picked.sort_unstable();
    picked.dedup();
    assert_eq!(picked.len(), 3);
}
