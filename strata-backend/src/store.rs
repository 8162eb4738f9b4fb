use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use strata_core::{Hash, StoreLabel, StoreValue};

use crate::StoreResult;

/// What kind of value a key holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// The key does not exist.
    None,
    /// A plain string.
    String,
    /// A hash.
    Hash,
    /// A list.
    List,
    /// A sorted set.
    SortedSet,
    /// Any other kind (sets, streams, ...).
    Other,
}

impl KeyType {
    /// Parses the reply of a `TYPE` command.
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "none" => KeyType::None,
            "string" => KeyType::String,
            "hash" => KeyType::Hash,
            "list" => KeyType::List,
            "zset" => KeyType::SortedSet,
            _ => KeyType::Other,
        }
    }
}

/// Which end of a list to operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEnd {
    /// The first element.
    Head,
    /// The last element.
    Tail,
}

/// The key-value store strata decorates.
///
/// Every method takes a fully resolved key; stores know nothing about
/// templates, namespaces or buckets. Implementations must follow Redis
/// semantics: missing keys behave like empty values, counters start at zero,
/// and operations against a key holding the wrong kind of value fail with
/// [`StoreError::Internal`](crate::StoreError::Internal).
#[async_trait]
pub trait Store: Send + Sync {
    // Strings

    /// Value of a string key.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Values of several string keys, positionally. Non-string keys read as `None`.
    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>>;

    /// Sets a string key. Returns whether the store accepted the write.
    async fn set(&self, key: &str, value: &str) -> StoreResult<bool>;

    /// Sets several string keys at once.
    async fn mset(&self, pairs: &[(String, String)]) -> StoreResult<bool>;

    /// Deletes keys, returning how many existed.
    async fn del(&self, keys: &[String]) -> StoreResult<u64>;

    /// Adds `delta` to an integer counter, returning the new value.
    async fn incr_by(&self, key: &str, delta: i64) -> StoreResult<i64>;

    // Keys

    /// Kind of value stored under `key`.
    async fn key_type(&self, key: &str) -> StoreResult<KeyType>;

    /// Expires `key` at a unix timestamp. Returns `false` if the key does not exist.
    async fn expire_at(&self, key: &str, timestamp: i64) -> StoreResult<bool>;

    /// Keys matching a glob pattern (`*`, `?`, `[...]`).
    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>>;

    /// Removes every key of the current database.
    async fn flush(&self) -> StoreResult<()>;

    // Hashes

    /// Value of one hash field.
    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>>;

    /// Every field of a hash. Empty if the key does not exist.
    async fn hget_all(&self, key: &str) -> StoreResult<Hash>;

    /// Sets several hash fields at once.
    async fn hset_multiple(&self, key: &str, fields: &[(String, String)]) -> StoreResult<bool>;

    /// Deletes hash fields, returning how many existed.
    async fn hdel(&self, key: &str, fields: &[String]) -> StoreResult<u64>;

    /// Number of fields in a hash.
    async fn hlen(&self, key: &str) -> StoreResult<u64>;

    /// Values of a hash, in field order.
    async fn hvals(&self, key: &str) -> StoreResult<Vec<String>>;

    /// Adds an integer to a hash field.
    async fn hincr_by(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64>;

    /// Adds a float to a hash field.
    async fn hincr_by_float(&self, key: &str, field: &str, delta: f64) -> StoreResult<f64>;

    // Lists

    /// Pushes values onto one end of a list, returning the new length.
    ///
    /// With `only_if_exists` nothing is pushed onto a missing list and `0` is
    /// returned.
    async fn push(
        &self,
        key: &str,
        values: &[String],
        end: ListEnd,
        only_if_exists: bool,
    ) -> StoreResult<u64>;

    /// Elements between `start` and `stop`, inclusive. Negative indexes count
    /// from the end.
    async fn lrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>>;

    /// Replaces the element at `index`.
    async fn lset(&self, key: &str, index: i64, value: &str) -> StoreResult<bool>;

    /// Removes and returns an element from one end of a list.
    async fn pop(&self, key: &str, end: ListEnd) -> StoreResult<Option<String>>;

    /// Like [`Store::pop`], waiting up to `timeout` for an element to appear.
    async fn blocking_pop(
        &self,
        key: &str,
        end: ListEnd,
        timeout: Duration,
    ) -> StoreResult<Option<String>>;

    /// Length of a list.
    async fn llen(&self, key: &str) -> StoreResult<u64>;

    // Sorted sets

    /// Adds or updates a member, returning how many members were added.
    async fn zadd(&self, key: &str, member: &str, score: f64) -> StoreResult<u64>;

    /// Removes a member, returning how many members were removed.
    async fn zrem(&self, key: &str, member: &str) -> StoreResult<u64>;

    /// Number of members.
    async fn zcard(&self, key: &str) -> StoreResult<u64>;

    /// Score of a member.
    async fn zscore(&self, key: &str, member: &str) -> StoreResult<Option<f64>>;

    /// Zero-based rank of a member, highest score first.
    async fn zrevrank(&self, key: &str, member: &str) -> StoreResult<Option<u64>>;

    /// Members with scores between ranks `start` and `stop`, highest score first.
    async fn zrevrange_with_scores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> StoreResult<Vec<(String, f64)>>;

    /// Members with scores in the closed interval `[min, max]`, lowest score first.
    async fn zrange_by_score_with_scores(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> StoreResult<Vec<(String, f64)>>;

    /// Removes members with scores in `[min, max]`, returning how many were removed.
    async fn zrem_range_by_score(&self, key: &str, min: f64, max: f64) -> StoreResult<u64>;

    /// Number of members with scores in `[min, max]`.
    async fn zcount(&self, key: &str, min: f64, max: f64) -> StoreResult<u64>;

    /// Adds `delta` to a member's score, returning the new score.
    async fn zincr_by(&self, key: &str, member: &str, delta: f64) -> StoreResult<f64>;

    /// Label identifying this store in logs and metrics.
    fn label(&self) -> StoreLabel {
        StoreLabel::new_static("store")
    }

    /// Reads a key as a tagged value: a string, a non-empty hash, or nothing.
    async fn value(&self, key: &str) -> StoreResult<StoreValue> {
        match self.key_type(key).await? {
            KeyType::String => Ok(self
                .get(key)
                .await?
                .map(StoreValue::Scalar)
                .unwrap_or_default()),
            KeyType::Hash => {
                let hash = self.hget_all(key).await?;
                if hash.is_empty() {
                    Ok(StoreValue::Missing)
                } else {
                    Ok(StoreValue::Hash(hash))
                }
            }
            _ => Ok(StoreValue::Missing),
        }
    }
}

/// Shared handle to a store, as held by every component.
pub type SharedStore = Arc<dyn Store>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_type_names() {
        assert_eq!(KeyType::from_type_name("zset"), KeyType::SortedSet);
        assert_eq!(KeyType::from_type_name("hash"), KeyType::Hash);
        assert_eq!(KeyType::from_type_name("none"), KeyType::None);
        assert_eq!(KeyType::from_type_name("stream"), KeyType::Other);
    }
}
