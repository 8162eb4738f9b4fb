//! Redis store implementation.

use std::time::Duration;

use async_trait::async_trait;
use redis::{Client, Cmd, FromRedisValue, aio::ConnectionManager};
use strata_backend::{KeyType, ListEnd, Store, StoreResult};
use strata_core::{Hash, StoreLabel};
use tokio::sync::OnceCell;
use tracing::{trace, warn};

use crate::error::Error;

/// Number of attempts made to establish the connection.
pub const DEFAULT_CONNECT_RETRIES: u32 = 3;

/// Redis store based on the redis-rs crate.
///
/// The connection is opened on first use through a [`ConnectionManager`],
/// which reconnects by itself once established. Opening it is attempted up to
/// `connect_retries` times; the data commands themselves are never retried.
///
/// [`ConnectionManager`]: redis::aio::ConnectionManager
#[derive(Clone)]
pub struct RedisStore {
    client: Client,
    connection: OnceCell<ConnectionManager>,
    connect_retries: u32,
    label: StoreLabel,
}

impl RedisStore {
    /// Creates a store for the local Redis server with default settings.
    pub fn new() -> Result<Self, Error> {
        Self::builder().build()
    }

    /// Creates a builder with default settings.
    #[must_use]
    pub fn builder() -> RedisStoreBuilder {
        RedisStoreBuilder::default()
    }

    /// Lazily connects to Redis through a [`ConnectionManager`].
    pub async fn connection(&self) -> Result<&ConnectionManager, Error> {
        trace!("Get connection manager");
        self.connection
            .get_or_try_init(|| async {
                let mut attempt = 1;
                loop {
                    trace!(attempt, "Initialize new redis connection manager");
                    match self.client.get_connection_manager().await {
                        Ok(manager) => return Ok(manager),
                        Err(error) if attempt < self.connect_retries => {
                            warn!(attempt, %error, "Redis connection failed, retrying");
                            attempt += 1;
                        }
                        Err(error) => return Err(Error::from(error)),
                    }
                }
            })
            .await
    }

    async fn query<T: FromRedisValue>(&self, cmd: &Cmd) -> StoreResult<T> {
        let mut connection = self.connection().await?.clone();
        let value = cmd.query_async(&mut connection).await.map_err(Error::from)?;
        Ok(value)
    }
}

/// Builder for [`RedisStore`].
pub struct RedisStoreBuilder {
    connection_info: String,
    connect_retries: u32,
    label: StoreLabel,
}

impl Default for RedisStoreBuilder {
    fn default() -> Self {
        Self {
            connection_info: "redis://127.0.0.1/".to_owned(),
            connect_retries: DEFAULT_CONNECT_RETRIES,
            label: StoreLabel::new_static("redis"),
        }
    }
}

impl RedisStoreBuilder {
    /// Set connection info (host, port, database, etc.).
    pub fn server(mut self, connection_info: impl Into<String>) -> Self {
        self.connection_info = connection_info.into();
        self
    }

    /// Set how many times opening the connection is attempted. Zero counts as one.
    pub fn connect_retries(mut self, connect_retries: u32) -> Self {
        self.connect_retries = connect_retries;
        self
    }

    /// Set the label used in logs and metrics.
    pub fn label(mut self, label: impl Into<StoreLabel>) -> Self {
        self.label = label.into();
        self
    }

    /// Create the store. No connection is opened yet.
    pub fn build(self) -> Result<RedisStore, Error> {
        Ok(RedisStore {
            client: Client::open(self.connection_info)?,
            connection: OnceCell::new(),
            connect_retries: self.connect_retries.max(1),
            label: self.label,
        })
    }
}

fn command(name: &'static str) -> Cmd {
    trace!(command = name, "Redis command");
    redis::cmd(name)
}

fn push_command(end: ListEnd, only_if_exists: bool) -> &'static str {
    match (end, only_if_exists) {
        (ListEnd::Head, false) => "LPUSH",
        (ListEnd::Head, true) => "LPUSHX",
        (ListEnd::Tail, false) => "RPUSH",
        (ListEnd::Tail, true) => "RPUSHX",
    }
}

fn pop_command(end: ListEnd) -> &'static str {
    match end {
        ListEnd::Head => "LPOP",
        ListEnd::Tail => "RPOP",
    }
}

fn blocking_pop_command(end: ListEnd) -> &'static str {
    match end {
        ListEnd::Head => "BLPOP",
        ListEnd::Tail => "BRPOP",
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.query(command("GET").arg(key)).await
    }

    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        self.query(command("MGET").arg(keys)).await
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<bool> {
        self.query::<()>(command("SET").arg(key).arg(value))
            .await?;
        Ok(true)
    }

    async fn mset(&self, pairs: &[(String, String)]) -> StoreResult<bool> {
        if pairs.is_empty() {
            return Ok(true);
        }
        let mut cmd = command("MSET");
        for (key, value) in pairs {
            cmd.arg(key).arg(value);
        }
        self.query::<()>(&cmd).await?;
        Ok(true)
    }

    async fn del(&self, keys: &[String]) -> StoreResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.query(command("DEL").arg(keys)).await
    }

    async fn incr_by(&self, key: &str, delta: i64) -> StoreResult<i64> {
        self.query(command("INCRBY").arg(key).arg(delta)).await
    }

    async fn key_type(&self, key: &str) -> StoreResult<KeyType> {
        let name: String = self.query(command("TYPE").arg(key)).await?;
        Ok(KeyType::from_type_name(&name))
    }

    async fn expire_at(&self, key: &str, timestamp: i64) -> StoreResult<bool> {
        self.query(command("EXPIREAT").arg(key).arg(timestamp))
            .await
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        self.query(command("KEYS").arg(pattern)).await
    }

    async fn flush(&self) -> StoreResult<()> {
        self.query(&command("FLUSHDB")).await
    }

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        self.query(command("HGET").arg(key).arg(field)).await
    }

    async fn hget_all(&self, key: &str) -> StoreResult<Hash> {
        let pairs: Vec<(String, String)> = self.query(command("HGETALL").arg(key)).await?;
        Ok(pairs.into_iter().collect())
    }

    async fn hset_multiple(&self, key: &str, fields: &[(String, String)]) -> StoreResult<bool> {
        if fields.is_empty() {
            return Ok(false);
        }
        let mut cmd = command("HSET");
        cmd.arg(key);
        for (field, value) in fields {
            cmd.arg(field).arg(value);
        }
        self.query::<u64>(&cmd).await?;
        Ok(true)
    }

    async fn hdel(&self, key: &str, fields: &[String]) -> StoreResult<u64> {
        if fields.is_empty() {
            return Ok(0);
        }
        self.query(command("HDEL").arg(key).arg(fields)).await
    }

    async fn hlen(&self, key: &str) -> StoreResult<u64> {
        self.query(command("HLEN").arg(key)).await
    }

    async fn hvals(&self, key: &str) -> StoreResult<Vec<String>> {
        self.query(command("HVALS").arg(key)).await
    }

    async fn hincr_by(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64> {
        self.query(command("HINCRBY").arg(key).arg(field).arg(delta))
            .await
    }

    async fn hincr_by_float(&self, key: &str, field: &str, delta: f64) -> StoreResult<f64> {
        self.query(command("HINCRBYFLOAT").arg(key).arg(field).arg(delta))
            .await
    }

    async fn push(
        &self,
        key: &str,
        values: &[String],
        end: ListEnd,
        only_if_exists: bool,
    ) -> StoreResult<u64> {
        if values.is_empty() {
            return self.llen(key).await;
        }
        self.query(command(push_command(end, only_if_exists)).arg(key).arg(values))
            .await
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        self.query(command("LRANGE").arg(key).arg(start).arg(stop))
            .await
    }

    async fn lset(&self, key: &str, index: i64, value: &str) -> StoreResult<bool> {
        self.query::<()>(command("LSET").arg(key).arg(index).arg(value))
            .await?;
        Ok(true)
    }

    async fn pop(&self, key: &str, end: ListEnd) -> StoreResult<Option<String>> {
        self.query(command(pop_command(end)).arg(key)).await
    }

    async fn blocking_pop(
        &self,
        key: &str,
        end: ListEnd,
        timeout: Duration,
    ) -> StoreResult<Option<String>> {
        let popped: Option<(String, String)> = self
            .query(
                command(blocking_pop_command(end))
                    .arg(key)
                    .arg(timeout.as_secs_f64()),
            )
            .await?;
        Ok(popped.map(|(_, value)| value))
    }

    async fn llen(&self, key: &str) -> StoreResult<u64> {
        self.query(command("LLEN").arg(key)).await
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> StoreResult<u64> {
        self.query(command("ZADD").arg(key).arg(score).arg(member))
            .await
    }

    async fn zrem(&self, key: &str, member: &str) -> StoreResult<u64> {
        self.query(command("ZREM").arg(key).arg(member)).await
    }

    async fn zcard(&self, key: &str) -> StoreResult<u64> {
        self.query(command("ZCARD").arg(key)).await
    }

    async fn zscore(&self, key: &str, member: &str) -> StoreResult<Option<f64>> {
        self.query(command("ZSCORE").arg(key).arg(member)).await
    }

    async fn zrevrank(&self, key: &str, member: &str) -> StoreResult<Option<u64>> {
        self.query(command("ZREVRANK").arg(key).arg(member)).await
    }

    async fn zrevrange_with_scores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> StoreResult<Vec<(String, f64)>> {
        self.query(
            command("ZREVRANGE")
                .arg(key)
                .arg(start)
                .arg(stop)
                .arg("WITHSCORES"),
        )
        .await
    }

    async fn zrange_by_score_with_scores(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> StoreResult<Vec<(String, f64)>> {
        self.query(
            command("ZRANGEBYSCORE")
                .arg(key)
                .arg(min)
                .arg(max)
                .arg("WITHSCORES"),
        )
        .await
    }

    async fn zrem_range_by_score(&self, key: &str, min: f64, max: f64) -> StoreResult<u64> {
        self.query(command("ZREMRANGEBYSCORE").arg(key).arg(min).arg(max))
            .await
    }

    async fn zcount(&self, key: &str, min: f64, max: f64) -> StoreResult<u64> {
        self.query(command("ZCOUNT").arg(key).arg(min).arg(max))
            .await
    }

    async fn zincr_by(&self, key: &str, member: &str, delta: f64) -> StoreResult<f64> {
        self.query(command("ZINCRBY").arg(key).arg(delta).arg(member))
            .await
    }

    fn label(&self) -> StoreLabel {
        self.label.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_commands() {
        assert_eq!(push_command(ListEnd::Head, false), "LPUSH");
        assert_eq!(push_command(ListEnd::Tail, true), "RPUSHX");
        assert_eq!(pop_command(ListEnd::Tail), "RPOP");
        assert_eq!(blocking_pop_command(ListEnd::Head), "BLPOP");
    }

    #[test]
    fn test_builder_defaults() {
        let store = RedisStore::builder().build().unwrap();
        assert_eq!(store.connect_retries, DEFAULT_CONNECT_RETRIES);
        assert_eq!(store.label().as_str(), "redis");

        let store = RedisStore::builder()
            .server("redis://127.0.0.1:6380/2")
            .connect_retries(0)
            .label("sessions")
            .build()
            .unwrap();
        assert_eq!(store.connect_retries, 1);
        assert_eq!(store.label().as_str(), "sessions");
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        assert!(RedisStore::builder().server("not-a-url").build().is_err());
    }
}
