//! Unit tests for the joke repository.

use chrono::{Duration, TimeZone, Utc};

use cheeseday::models::joke::NewJoke;
use cheeseday::persistence::db;
use cheeseday::persistence::joke_repo::{Eligibility, JokeRepo};
use cheeseday::AppError;

fn sample(n: u32) -> NewJoke {
    NewJoke::new(
        format!("What cheese {n}?"),
        "Tell me",
        format!("Answer {n}"),
        format!("https://img.example/{n}.jpg"),
    )
}

#[tokio::test]
async fn insert_then_get_round_trips() {
    let pool = db::connect_memory().await.expect("db");
    let mut conn = db::acquire(&pool).await.expect("conn");
    let mut repo = JokeRepo::new(&mut conn);

    let stored = repo.insert(&sample(1)).await.expect("insert");
    let loaded = repo.get_by_id(stored.id).await.expect("get");

    assert_eq!(loaded, stored);
    assert_eq!(loaded.prompt, "What cheese 1?");
    assert_eq!(loaded.consumed_at, None);
}

#[tokio::test]
async fn get_unknown_id_is_not_found() {
    let pool = db::connect_memory().await.expect("db");
    let mut conn = db::acquire(&pool).await.expect("conn");

    let err = JokeRepo::new(&mut conn)
        .get_by_id(404)
        .await
        .expect_err("absent joke");
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn eligibility_filters_on_consumption_marker() {
    let pool = db::connect_memory().await.expect("db");
    let mut conn = db::acquire(&pool).await.expect("conn");
    let mut repo = JokeRepo::new(&mut conn);

    let now = Utc.with_ymd_and_hms(2024, 6, 15, 9, 0, 0).unwrap();
    let fresh = repo.insert(&sample(1)).await.expect("insert");
    let recent = repo.insert(&sample(2)).await.expect("insert");
    let stale = repo.insert(&sample(3)).await.expect("insert");
    repo.mark_consumed(recent.id, now - Duration::days(3))
        .await
        .expect("mark recent");
    repo.mark_consumed(stale.id, now - Duration::days(60))
        .await
        .expect("mark stale");

    assert_eq!(repo.count_eligible(Eligibility::Any).await.expect("count"), 3);
    assert_eq!(
        repo.count_eligible(Eligibility::NeverConsumed)
            .await
            .expect("count"),
        1
    );
    let cutoff = now - Duration::days(30);
    assert_eq!(
        repo.count_eligible(Eligibility::ConsumedBefore(cutoff))
            .await
            .expect("count"),
        2
    );

    let first = repo
        .nth_eligible(Eligibility::ConsumedBefore(cutoff), 0)
        .await
        .expect("nth")
        .expect("row");
    let second = repo
        .nth_eligible(Eligibility::ConsumedBefore(cutoff), 1)
        .await
        .expect("nth")
        .expect("row");
    assert_eq!(first.id, fresh.id);
    assert_eq!(second.id, stale.id);
    assert!(repo
        .nth_eligible(Eligibility::ConsumedBefore(cutoff), 2)
        .await
        .expect("nth")
        .is_none());
}

#[tokio::test]
async fn marking_twice_keeps_the_later_timestamp() {
    let pool = db::connect_memory().await.expect("db");
    let mut conn = db::acquire(&pool).await.expect("conn");
    let mut repo = JokeRepo::new(&mut conn);

    let joke = repo.insert(&sample(1)).await.expect("insert");
    let earlier = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    let later = Utc.with_ymd_and_hms(2024, 6, 2, 9, 0, 0).unwrap();
    repo.mark_consumed(joke.id, earlier).await.expect("first mark");
    repo.mark_consumed(joke.id, later).await.expect("second mark");

    let since = repo.list_consumed_since(earlier).await.expect("list");
    assert_eq!(since.len(), 1);
    assert_eq!(since[0].consumed_at, Some(later));
}

#[tokio::test]
async fn mark_unknown_joke_is_not_found() {
    let pool = db::connect_memory().await.expect("db");
    let mut conn = db::acquire(&pool).await.expect("conn");

    let err = JokeRepo::new(&mut conn)
        .mark_consumed(9, Utc::now())
        .await
        .expect_err("absent joke");
    assert!(matches!(err, AppError::NotFound(_)));
}
