//! Tests against a live Redis server.
//!
//! Every test flushes the database behind `REDIS_URL` (default
//! `redis://127.0.0.1/15`), so they are ignored by default and run serially.

use std::{sync::Arc, time::Duration};

use pretty_assertions::assert_eq;
use serial_test::serial;
use strata_backend::{
    KeyType, KeyValueStore, LeaderOptions, Leaderboard, ListEnd, Stats, Store, StoreError,
};
use strata_core::{Buckets, FieldValue, KeyOptions, KeyResolver, StoreValue};
use strata_redis::RedisStore;

async fn store() -> RedisStore {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/15".to_owned());
    let store = RedisStore::builder().server(url).build().unwrap();
    store.flush().await.unwrap();
    store
}

#[tokio::test]
#[ignore = "needs a Redis server"]
#[serial]
async fn test_strings_and_hashes() {
    let store = store().await;

    assert!(store.set("a", "1").await.unwrap());
    assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
    assert_eq!(store.incr_by("a", 4).await.unwrap(), 5);
    assert_eq!(store.key_type("a").await.unwrap(), KeyType::String);

    store
        .hset_multiple("h", &[("f".into(), "1".into()), ("g".into(), "x".into())])
        .await
        .unwrap();
    assert_eq!(store.hincr_by_float("h", "f", 0.5).await.unwrap(), 1.5);
    assert_eq!(store.hlen("h").await.unwrap(), 2);
    assert!(matches!(
        store.value("h").await.unwrap(),
        StoreValue::Hash(hash) if hash["g"] == "x"
    ));
    assert!(matches!(
        store.get("h").await,
        Err(StoreError::Internal(_))
    ));
}

#[tokio::test]
#[ignore = "needs a Redis server"]
#[serial]
async fn test_lists() {
    let store = store().await;
    let values = ["a".to_owned(), "b".to_owned()];

    assert_eq!(store.push("l", &values, ListEnd::Tail, true).await.unwrap(), 0);
    assert_eq!(store.push("l", &values, ListEnd::Tail, false).await.unwrap(), 2);
    assert_eq!(store.lrange("l", 0, -1).await.unwrap(), ["a", "b"]);
    assert_eq!(store.pop("l", ListEnd::Tail).await.unwrap().as_deref(), Some("b"));
    assert_eq!(
        store
            .blocking_pop("l", ListEnd::Head, Duration::from_millis(100))
            .await
            .unwrap()
            .as_deref(),
        Some("a")
    );
    assert_eq!(
        store
            .blocking_pop("l", ListEnd::Head, Duration::from_millis(100))
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
#[ignore = "needs a Redis server"]
#[serial]
async fn test_leaderboard() {
    let kv = KeyValueStore::new(Arc::new(store().await), KeyResolver::new("test"));
    let board = Leaderboard::new("name", &kv);
    for index in 1..=101u32 {
        board
            .add_member(&format!("member_{index}"), f64::from(index))
            .await
            .unwrap();
    }

    assert_eq!(board.total_pages().await.unwrap(), 2);
    assert_eq!(board.rank_for("member_1", false).await.unwrap(), Some(101));
    let second = board
        .leaders(2, LeaderOptions::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].member, "member_1");
    assert_eq!(board.remove_members_in_score_range(90.0, 101.0).await.unwrap(), 12);
}

#[tokio::test]
#[ignore = "needs a Redis server"]
#[serial]
async fn test_stats() {
    let store = store().await;
    let kv = KeyValueStore::new(
        Arc::new(store.clone()),
        KeyResolver::new("test").with_format("{:key}"),
    );
    let stats = Stats::new(kv);

    stats.inc("requests", "ok", Buckets::new(), &KeyOptions::new()).await.unwrap();
    let counters = stats
        .inc("requests", "ok", Buckets::new(), &KeyOptions::new())
        .await
        .unwrap()
        .into_single()
        .unwrap();
    assert_eq!(counters.get("ok"), Some(&FieldValue::Int(2)));
    assert_eq!(
        store.hget("stats:global:requests", "ok").await.unwrap().as_deref(),
        Some("2")
    );
}

#[tokio::test]
#[serial]
async fn test_unreachable_server_is_a_connection_error() {
    let store = RedisStore::builder()
        .server("redis://127.0.0.1:1/")
        .connect_retries(2)
        .build()
        .unwrap();
    let error = store.get("key").await.unwrap_err();
    assert!(error.is_connection());
}
