//! Leaderboard ranking, paging and windows over the in-memory store.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use strata_backend::{Entry, KeyValueStore, LeaderOptions, Leaderboard, StoreError};
use strata_core::KeyResolver;
use strata_memory::MemoryStore;

fn kv() -> KeyValueStore {
    KeyValueStore::new(Arc::new(MemoryStore::new()), KeyResolver::new("test"))
}

async fn board_with_members(count: u32) -> Leaderboard {
    let board = Leaderboard::new("name", &kv());
    for index in 1..=count {
        board
            .add_member(&format!("member_{index}"), f64::from(index))
            .await
            .unwrap();
    }
    board
}

fn entry(member: &str, score: f64, rank: u64) -> Entry {
    Entry {
        member: member.to_owned(),
        score: Some(score),
        rank: Some(rank),
    }
}

#[tokio::test]
async fn test_defaults() {
    let board = Leaderboard::new("name", &kv());
    assert_eq!(board.name(), "name");
    assert_eq!(board.namespace(), "leaderboards");
    assert_eq!(board.page_size(), 100);
    assert_eq!(board.key(), "test:leaderboards:name");

    let board = board.with_namespace("boards");
    assert_eq!(board.key(), "test:boards:name");
}

#[tokio::test]
async fn test_page_size_resets_on_non_positive() {
    let mut board = Leaderboard::new("name", &kv()).with_page_size(10);
    assert_eq!(board.page_size(), 10);
    board.set_page_size(0);
    assert_eq!(board.page_size(), 100);
    board.set_page_size(-3);
    assert_eq!(board.page_size(), 100);
}

#[tokio::test]
async fn test_add_and_remove_members() {
    let board = Leaderboard::new("name", &kv());
    assert_eq!(board.add_member("member", 1.0).await.unwrap(), 1);
    assert_eq!(board.add_member("member", 5.0).await.unwrap(), 0);
    assert_eq!(board.total_members().await.unwrap(), 1);
    assert_eq!(board.score_for("member").await.unwrap(), Some(5.0));
    assert_eq!(board.remove_member("member").await.unwrap(), 1);
    assert_eq!(board.total_members().await.unwrap(), 0);
}

#[tokio::test]
async fn test_total_pages_and_score() {
    let board = board_with_members(101).await;
    assert_eq!(board.total_members().await.unwrap(), 101);
    assert_eq!(board.total_pages().await.unwrap(), 2);
    assert_eq!(board.total_score().await.unwrap(), 5151.0);

    let empty = Leaderboard::new("empty", &kv());
    assert_eq!(empty.total_pages().await.unwrap(), 0);
}

#[tokio::test]
async fn test_total_members_in_score_range_is_inclusive() {
    let board = board_with_members(101).await;
    assert_eq!(board.total_members_in_score_range(2.0, 4.0).await.unwrap(), 3);
}

#[tokio::test]
async fn test_rank_for() {
    let board = board_with_members(5).await;
    assert_eq!(board.rank_for("member_1", false).await.unwrap(), Some(5));
    assert_eq!(board.rank_for("member_1", true).await.unwrap(), Some(4));
    assert_eq!(board.rank_for("member_5", false).await.unwrap(), Some(1));
    assert_eq!(board.rank_for("nobody", false).await.unwrap(), None);
}

#[tokio::test]
async fn test_zero_score_member_exists() {
    let board = Leaderboard::new("name", &kv());
    board.add_member("zero", 0.0).await.unwrap();
    assert!(board.check_member("zero").await.unwrap());
    assert_eq!(board.rank_for("zero", false).await.unwrap(), Some(1));
    assert!(!board.check_member("nobody").await.unwrap());
}

#[tokio::test]
async fn test_change_score_for() {
    let board = Leaderboard::new("name", &kv());
    board.add_member("member_1", 5.0).await.unwrap();
    assert_eq!(board.change_score_for("member_1", 5.0).await.unwrap(), 10.0);
    assert_eq!(board.change_score_for("member_1", -7.5).await.unwrap(), 2.5);
    assert_eq!(board.change_score_for("new", 3.0).await.unwrap(), 3.0);
}

#[tokio::test]
async fn test_score_and_rank_for() {
    let board = board_with_members(5).await;
    assert_eq!(
        board.score_and_rank_for("member_1", false).await.unwrap(),
        entry("member_1", 1.0, 5)
    );
    assert_eq!(
        board.score_and_rank_for("nobody", false).await.unwrap(),
        Entry {
            member: "nobody".into(),
            score: None,
            rank: None
        }
    );
}

#[tokio::test]
async fn test_leaders_pagination() {
    let board = board_with_members(101).await;
    let options = LeaderOptions::default();

    let first = board.leaders(1, options).await.unwrap().unwrap();
    assert_eq!(first.len(), 100);
    assert_eq!(first[0], entry("member_101", 101.0, 1));

    let second = board.leaders(2, options).await.unwrap().unwrap();
    assert_eq!(second, vec![entry("member_1", 1.0, 101)]);
}

#[tokio::test]
async fn test_leaders_clamps_page() {
    let board = board_with_members(101).await;
    let options = LeaderOptions::default();

    let below = board.leaders(0, options).await.unwrap().unwrap();
    assert_eq!(below[0].member, "member_101");
    let negative = board.leaders(-4, options).await.unwrap().unwrap();
    assert_eq!(negative[0].member, "member_101");

    let beyond = board.leaders(9, options).await.unwrap().unwrap();
    assert_eq!(beyond, vec![entry("member_1", 1.0, 101)]);
}

#[tokio::test]
async fn test_leaders_options() {
    let board = board_with_members(3).await;

    let bare = board
        .leaders(1, LeaderOptions::default().with_scores(false).with_rank(false))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        bare[0],
        Entry {
            member: "member_3".into(),
            score: None,
            rank: None
        }
    );

    let zero = board
        .leaders(1, LeaderOptions::default().zero_indexed(true))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(zero[0].rank, Some(0));
    assert_eq!(zero[2].rank, Some(2));
}

#[tokio::test]
async fn test_leaders_on_empty_board() {
    let board = Leaderboard::new("empty", &kv());
    assert_eq!(board.leaders(1, LeaderOptions::default()).await.unwrap(), None);
}

#[tokio::test]
async fn test_around_me() {
    let board = board_with_members(101).await.with_page_size(10);
    let around = board
        .around_me("member_50", LeaderOptions::default())
        .await
        .unwrap()
        .unwrap();

    // member_50 sits at zero-based rank 51; the window starts five above it.
    assert_eq!(around.len(), 10);
    assert_eq!(around[0], entry("member_55", 55.0, 47));
    assert_eq!(around[4], entry("member_51", 51.0, 51));
    assert_eq!(around[5], entry("member_50", 50.0, 52));
}

#[tokio::test]
async fn test_around_me_near_top_starts_at_zero() {
    let board = board_with_members(20).await.with_page_size(10);
    let around = board
        .around_me("member_19", LeaderOptions::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(around[0].member, "member_20");
    assert_eq!(around.len(), 10);
}

#[tokio::test]
async fn test_around_me_missing_member() {
    let board = board_with_members(3).await;
    let error = board
        .around_me("nobody", LeaderOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        StoreError::MemberNotFound { ref leaderboard, ref member }
            if leaderboard == "name" && member == "nobody"
    ));
}

#[tokio::test]
async fn test_ranked_in_list() {
    let board = board_with_members(25).await;
    let ranked = board
        .ranked_in_list(["member_1", "member_5", "member_10", "nobody"], LeaderOptions::default())
        .await
        .unwrap();

    assert_eq!(ranked.len(), 4);
    assert_eq!(ranked[0], entry("member_1", 1.0, 25));
    assert_eq!(ranked[1], entry("member_5", 5.0, 21));
    assert_eq!(ranked[2], entry("member_10", 10.0, 16));
    assert_eq!(ranked[3].score, None);
    assert_eq!(ranked[3].rank, None);

    let without_scores = board
        .ranked_in_list(["member_1"], LeaderOptions::default().with_scores(false))
        .await
        .unwrap();
    assert_eq!(without_scores[0].score, None);
    assert_eq!(without_scores[0].rank, Some(25));
}

#[tokio::test]
async fn test_scored_in_list() {
    let board = board_with_members(10).await;
    let scored = board.scored_in_list(3.0, 5.0, true).await.unwrap();
    let members: Vec<(&str, Option<f64>)> = scored
        .iter()
        .map(|entry| (entry.member.as_str(), entry.score))
        .collect();
    assert_eq!(
        members,
        [
            ("member_3", Some(3.0)),
            ("member_4", Some(4.0)),
            ("member_5", Some(5.0))
        ]
    );
}

#[tokio::test]
async fn test_remove_members_in_score_range() {
    let board = board_with_members(5).await;
    for (member, score) in [("cheater_1", 100.0), ("cheater_2", 101.0), ("cheater_3", 102.0)] {
        board.add_member(member, score).await.unwrap();
    }
    assert_eq!(board.total_members().await.unwrap(), 8);

    assert_eq!(
        board.remove_members_in_score_range(100.0, 102.0).await.unwrap(),
        3
    );
    assert_eq!(board.total_members().await.unwrap(), 5);

    let leaders = board
        .leaders(1, LeaderOptions::default())
        .await
        .unwrap()
        .unwrap();
    assert!(leaders.iter().all(|entry| entry.score.unwrap() < 100.0));
}

#[tokio::test]
async fn test_all_members() {
    let board = board_with_members(3).await;
    let members: Vec<String> = board
        .all_members()
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.member)
        .collect();
    assert_eq!(members, ["member_3", "member_2", "member_1"]);
}
