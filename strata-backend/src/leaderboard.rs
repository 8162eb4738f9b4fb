//! Sorted-set leaderboards.
//!
//! A [`Leaderboard`] is a handle on one sorted set: it holds a name, a page
//! size and the store it talks to, and keeps no membership state of its own.
//! Ranks are always computed highest score first and are 1-based unless a
//! zero-indexed rank is requested.
//!
//! ```
//! use std::sync::Arc;
//! use strata_backend::{KeyValueStore, Leaderboard, LeaderOptions};
//! use strata_core::KeyResolver;
//! use strata_memory::MemoryStore;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
//! let kv = KeyValueStore::new(Arc::new(MemoryStore::new()), KeyResolver::new("test"));
//! let board = Leaderboard::new("highscores", &kv).with_page_size(2);
//!
//! for (member, score) in [("ann", 10.0), ("bob", 30.0), ("cid", 20.0)] {
//!     board.add_member(member, score).await?;
//! }
//!
//! assert_eq!(board.key(), "test:leaderboards:highscores");
//! assert_eq!(board.total_pages().await?, 2);
//! assert_eq!(board.rank_for("bob", false).await?, Some(1));
//!
//! let first = board.leaders(1, LeaderOptions::default()).await?.unwrap_or_default();
//! let members: Vec<_> = first.iter().map(|entry| entry.member.as_str()).collect();
//! assert_eq!(members, ["bob", "cid"]);
//! # Ok::<_, strata_backend::StoreError>(())
//! # }).unwrap();
//! ```

use std::{fmt, future::Future};

use strata_core::{KeyOptions, KeyResolver};
use tracing::debug;

use crate::{
    KeyValueStore, SharedStore, StoreError, StoreResult,
    middleware::{Call, Middleware, Middlewares},
};

const COMPONENT: &str = "leaderboard";

/// Page size used when none (or a non-positive one) is given.
pub const DEFAULT_PAGE_SIZE: u64 = 100;

/// Namespace leaderboards live under unless configured otherwise.
pub const NAMESPACE: &str = "leaderboards";

/// What to attach to each entry of a ranked listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderOptions {
    /// Attach each member's score.
    pub with_scores: bool,
    /// Attach each member's rank.
    pub with_rank: bool,
    /// Count ranks from zero instead of one.
    pub zero_indexed: bool,
}

impl Default for LeaderOptions {
    fn default() -> Self {
        Self {
            with_scores: true,
            with_rank: true,
            zero_indexed: false,
        }
    }
}

impl LeaderOptions {
    /// Sets whether scores are attached.
    pub fn with_scores(mut self, with_scores: bool) -> Self {
        self.with_scores = with_scores;
        self
    }

    /// Sets whether ranks are attached.
    pub fn with_rank(mut self, with_rank: bool) -> Self {
        self.with_rank = with_rank;
        self
    }

    /// Sets whether ranks count from zero.
    pub fn zero_indexed(mut self, zero_indexed: bool) -> Self {
        self.zero_indexed = zero_indexed;
        self
    }
}

/// One member of a ranked listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Member identifier.
    pub member: String,
    /// Score, when requested and known.
    pub score: Option<f64>,
    /// Rank, when requested and known.
    pub rank: Option<u64>,
}

/// A ranking over one named sorted set.
#[derive(Clone)]
pub struct Leaderboard {
    name: String,
    namespace: String,
    page_size: u64,
    store: SharedStore,
    resolver: KeyResolver,
    middlewares: Middlewares,
}

impl fmt::Debug for Leaderboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Leaderboard")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("page_size", &self.page_size)
            .field("store", &self.store.label())
            .finish()
    }
}

impl Leaderboard {
    /// Creates a leaderboard named `name`, sharing the store, resolver and
    /// middlewares of `kv`.
    pub fn new(name: impl Into<String>, kv: &KeyValueStore) -> Self {
        Self {
            name: name.into(),
            namespace: NAMESPACE.to_owned(),
            page_size: DEFAULT_PAGE_SIZE,
            store: kv.store().clone(),
            resolver: kv.resolver().clone(),
            middlewares: kv.middlewares().clone(),
        }
    }

    /// Sets the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the page size. See [`Leaderboard::set_page_size`].
    pub fn with_page_size(mut self, page_size: i64) -> Self {
        self.set_page_size(page_size);
        self
    }

    /// Appends a call middleware.
    pub fn with_middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Sets the page size. Values below one reset it to [`DEFAULT_PAGE_SIZE`].
    pub fn set_page_size(&mut self, page_size: i64) {
        self.page_size = u64::try_from(page_size)
            .ok()
            .filter(|size| *size >= 1)
            .unwrap_or(DEFAULT_PAGE_SIZE);
    }

    /// Current page size.
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Leaderboard name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace the leaderboard lives under.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Resolved key of the backing sorted set.
    pub fn key(&self) -> String {
        let options = KeyOptions::new().namespace(self.namespace.as_str());
        self.resolver.resolve_key(&self.name, &options)
    }

    async fn instrument<T, F>(&self, operation: &'static str, call: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        let label = self.store.label();
        self.middlewares
            .run(Call::new(COMPONENT, operation, &self.name, &label), call)
            .await
    }

    fn rank_from(&self, zero_based: u64, zero_indexed: bool) -> u64 {
        if zero_indexed { zero_based } else { zero_based + 1 }
    }

    /// Adds `member` with `score`, or updates its score. Returns how many
    /// members were added.
    pub async fn add_member(&self, member: &str, score: f64) -> StoreResult<u64> {
        self.instrument("add_member", self.store.zadd(&self.key(), member, score))
            .await
    }

    /// Removes `member`. Returns how many members were removed.
    pub async fn remove_member(&self, member: &str) -> StoreResult<u64> {
        self.instrument("remove_member", self.store.zrem(&self.key(), member))
            .await
    }

    /// Number of members.
    pub async fn total_members(&self) -> StoreResult<u64> {
        self.instrument("total_members", self.store.zcard(&self.key()))
            .await
    }

    async fn pages(&self) -> StoreResult<u64> {
        let members = self.store.zcard(&self.key()).await?;
        Ok(members.div_ceil(self.page_size))
    }

    /// Number of pages at the current page size.
    pub async fn total_pages(&self) -> StoreResult<u64> {
        self.instrument("total_pages", self.pages()).await
    }

    /// Sum of all scores.
    pub async fn total_score(&self) -> StoreResult<f64> {
        self.instrument("total_score", async {
            let members = self.store.zrevrange_with_scores(&self.key(), 0, -1).await?;
            Ok(members.iter().map(|(_, score)| score).sum())
        })
        .await
    }

    /// Number of members scored within `[min, max]`.
    pub async fn total_members_in_score_range(&self, min: f64, max: f64) -> StoreResult<u64> {
        self.instrument(
            "total_members_in_score_range",
            self.store.zcount(&self.key(), min, max),
        )
        .await
    }

    /// Adds `delta` to the score of `member`, returning the new score.
    pub async fn change_score_for(&self, member: &str, delta: f64) -> StoreResult<f64> {
        self.instrument(
            "change_score_for",
            self.store.zincr_by(&self.key(), member, delta),
        )
        .await
    }

    async fn rank_of(&self, member: &str, zero_indexed: bool) -> StoreResult<Option<u64>> {
        let key = self.key();
        if self.store.zscore(&key, member).await?.is_none() {
            return Ok(None);
        }
        Ok(self
            .store
            .zrevrank(&key, member)
            .await?
            .map(|rank| self.rank_from(rank, zero_indexed)))
    }

    /// Rank of `member`, or `None` if it is not on the leaderboard.
    pub async fn rank_for(&self, member: &str, zero_indexed: bool) -> StoreResult<Option<u64>> {
        self.instrument("rank_for", self.rank_of(member, zero_indexed))
            .await
    }

    /// Score of `member`, or `None` if it is not on the leaderboard.
    pub async fn score_for(&self, member: &str) -> StoreResult<Option<f64>> {
        self.instrument("score_for", self.store.zscore(&self.key(), member))
            .await
    }

    /// Whether `member` is on the leaderboard.
    pub async fn check_member(&self, member: &str) -> StoreResult<bool> {
        self.instrument("check_member", async {
            Ok(self.store.zscore(&self.key(), member).await?.is_some())
        })
        .await
    }

    async fn entry_for(&self, member: &str, zero_indexed: bool) -> StoreResult<Entry> {
        let score = self.store.zscore(&self.key(), member).await?;
        let rank = match score {
            Some(_) => self.rank_of(member, zero_indexed).await?,
            None => None,
        };
        Ok(Entry {
            member: member.to_owned(),
            score,
            rank,
        })
    }

    /// Score and rank of `member` together.
    pub async fn score_and_rank_for(&self, member: &str, zero_indexed: bool) -> StoreResult<Entry> {
        self.instrument("score_and_rank_for", self.entry_for(member, zero_indexed))
            .await
    }

    /// Removes every member scored within `[min, max]`, returning how many
    /// were removed.
    pub async fn remove_members_in_score_range(&self, min: f64, max: f64) -> StoreResult<u64> {
        self.instrument(
            "remove_members_in_score_range",
            self.store.zrem_range_by_score(&self.key(), min, max),
        )
        .await
    }

    async fn ranked_range(
        &self,
        start: u64,
        options: LeaderOptions,
    ) -> StoreResult<Option<Vec<Entry>>> {
        let key = self.key();
        let end = start + self.page_size - 1;
        let members = self
            .store
            .zrevrange_with_scores(&key, to_index(start), to_index(end))
            .await?;
        if members.is_empty() {
            return Ok(None);
        }
        let mut entries = Vec::with_capacity(members.len());
        for (member, score) in members {
            let rank = if options.with_rank {
                self.rank_of(&member, options.zero_indexed).await?
            } else {
                None
            };
            entries.push(Entry {
                member,
                score: options.with_scores.then_some(score),
                rank,
            });
        }
        Ok(Some(entries))
    }

    /// One page of members, highest score first.
    ///
    /// `page` is clamped to `[1, total_pages]`. Returns `None` when the
    /// leaderboard is empty.
    pub async fn leaders(&self, page: i64, options: LeaderOptions) -> StoreResult<Option<Vec<Entry>>> {
        self.instrument("leaders", async {
            let pages = self.pages().await?;
            let page = u64::try_from(page).unwrap_or(0).clamp(1, pages.max(1));
            let start = (page - 1) * self.page_size;
            debug!(leaderboard = %self.name, page, start, "leaders page");
            self.ranked_range(start, options).await
        })
        .await
    }

    /// A page-sized window centred on `member`.
    ///
    /// Fails with [`StoreError::MemberNotFound`] when `member` is not on the
    /// leaderboard.
    pub async fn around_me(
        &self,
        member: &str,
        options: LeaderOptions,
    ) -> StoreResult<Option<Vec<Entry>>> {
        self.instrument("around_me", async {
            let center = self
                .store
                .zrevrank(&self.key(), member)
                .await?
                .ok_or_else(|| StoreError::MemberNotFound {
                    leaderboard: self.name.clone(),
                    member: member.to_owned(),
                })?;
            let start = center.saturating_sub(self.page_size / 2);
            debug!(leaderboard = %self.name, member, center, start, "around me window");
            self.ranked_range(start, options).await
        })
        .await
    }

    /// Score and rank of each listed member, in the order given.
    pub async fn ranked_in_list<I, S>(
        &self,
        members: I,
        options: LeaderOptions,
    ) -> StoreResult<Vec<Entry>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let members: Vec<String> = members.into_iter().map(|m| m.as_ref().to_owned()).collect();
        self.instrument("ranked_in_list", async {
            let mut entries = Vec::with_capacity(members.len());
            for member in &members {
                let mut entry = self.entry_for(member, options.zero_indexed).await?;
                if !options.with_scores {
                    entry.score = None;
                }
                if !options.with_rank {
                    entry.rank = None;
                }
                entries.push(entry);
            }
            Ok(entries)
        })
        .await
    }

    /// Members scored within `[from, to]`, lowest score first.
    pub async fn scored_in_list(
        &self,
        from: f64,
        to: f64,
        with_scores: bool,
    ) -> StoreResult<Vec<Entry>> {
        self.instrument("scored_in_list", async {
            let members = self
                .store
                .zrange_by_score_with_scores(&self.key(), from, to)
                .await?;
            Ok(members
                .into_iter()
                .map(|(member, score)| Entry {
                    member,
                    score: with_scores.then_some(score),
                    rank: None,
                })
                .collect())
        })
        .await
    }

    /// Every member with its score, highest score first.
    pub async fn all_members(&self) -> StoreResult<Vec<Entry>> {
        self.instrument("all_members", async {
            let members = self.store.zrevrange_with_scores(&self.key(), 0, -1).await?;
            Ok(members
                .into_iter()
                .map(|(member, score)| Entry {
                    member,
                    score: Some(score),
                    rank: None,
                })
                .collect())
        })
        .await
    }
}

fn to_index(index: u64) -> i64 {
    i64::try_from(index).unwrap_or(i64::MAX)
}
