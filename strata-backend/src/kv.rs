//! Typed key/value operations over a [`Store`](crate::Store).
//!
//! [`KeyValueStore`] resolves every logical name through its
//! [`KeyResolver`] before touching the store, and hands logical names back
//! on search results. Calls are sequential: compound operations such as
//! writing a hash and reading it back are not atomic.

use std::{fmt, future::Future, time::Duration};

use indexmap::IndexMap;
use strata_core::{
    Expiry, FieldValue, FieldValues, Flattened, Hash, HashRead, KeyOptions, KeyResolver,
    StoreValue, Value,
};
use tracing::{debug, warn};

use crate::{
    ListEnd, SharedStore, StoreError, StoreResult,
    middleware::{Call, Middleware, Middlewares},
};

const COMPONENT: &str = "kv";

/// Key/value operations for strings, hashes and lists.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use strata_backend::KeyValueStore;
/// use strata_core::{KeyOptions, KeyResolver, StoreValue};
/// use strata_memory::MemoryStore;
///
/// # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
/// let kv = KeyValueStore::new(Arc::new(MemoryStore::new()), KeyResolver::new("test"));
/// let options = KeyOptions::default();
///
/// kv.write("greeting", "hello", &options).await?;
/// assert_eq!(kv.key("greeting", &options), "test:greeting");
/// assert_eq!(kv.read("greeting", &options).await?, StoreValue::Scalar("hello".into()));
/// # Ok::<_, strata_backend::StoreError>(())
/// # }).unwrap();
/// ```
#[derive(Clone)]
pub struct KeyValueStore {
    store: SharedStore,
    resolver: KeyResolver,
    expiry: Option<Expiry>,
    middlewares: Middlewares,
}

impl fmt::Debug for KeyValueStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyValueStore")
            .field("store", &self.store.label())
            .field("resolver", &self.resolver)
            .field("expiry", &self.expiry)
            .field("middlewares", &self.middlewares)
            .finish()
    }
}

impl KeyValueStore {
    /// Creates a key/value store over `store`, resolving keys with `resolver`.
    pub fn new(store: SharedStore, resolver: KeyResolver) -> Self {
        Self {
            store,
            resolver,
            expiry: None,
            middlewares: Middlewares::new(),
        }
    }

    /// Sets the expiry applied to writes that do not carry one.
    ///
    /// Only [`write`](Self::write), [`write_many`](Self::write_many) and
    /// [`write_hash`](Self::write_hash) use it. Counters and lists expire only
    /// when the call's own [`KeyOptions::expiry`] is set.
    pub fn with_expiry(mut self, expiry: Expiry) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Appends a call middleware.
    pub fn with_middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Replaces the middleware list.
    pub fn with_middlewares(mut self, middlewares: Middlewares) -> Self {
        self.middlewares = middlewares;
        self
    }

    /// Swaps the key resolver. Takes effect on the next call.
    pub fn reconfigure(&mut self, resolver: KeyResolver) {
        self.resolver = resolver;
    }

    /// The key resolver.
    pub fn resolver(&self) -> &KeyResolver {
        &self.resolver
    }

    /// The underlying store.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// The middleware list.
    pub fn middlewares(&self) -> &Middlewares {
        &self.middlewares
    }

    /// The default expiry.
    pub fn expiry(&self) -> Option<Expiry> {
        self.expiry
    }

    /// Resolves `name` into a store key.
    pub fn key(&self, name: &str, options: &KeyOptions) -> String {
        self.resolver.resolve_key(name, options)
    }

    async fn instrument<T, F>(&self, operation: &'static str, name: &str, call: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        let label = self.store.label();
        self.middlewares
            .run(Call::new(COMPONENT, operation, name, &label), call)
            .await
    }

    async fn expire(&self, key: &str, expiry: Option<Expiry>) -> StoreResult<()> {
        if let Some(expiry) = expiry {
            let at = expiry.timestamp_from_now();
            debug!(key, at, "expire key");
            self.store.expire_at(key, at).await?;
        }
        Ok(())
    }

    /// Expiry after a write: the call's own, else the default.
    async fn apply_write_expiry(&self, key: &str, options: &KeyOptions) -> StoreResult<()> {
        self.expire(key, options.expiry.or(self.expiry)).await
    }

    /// Expiry after a counter or list mutation: only the call's own.
    async fn apply_expiry(&self, key: &str, options: &KeyOptions) -> StoreResult<()> {
        self.expire(key, options.expiry).await
    }

    // Scalars

    /// Writes a value under `name`.
    ///
    /// Hash values are written with [`KeyValueStore::write_hash`]. Returns the
    /// stored value, or `None` if the store rejected the write.
    pub async fn write(
        &self,
        name: &str,
        value: impl Into<Value>,
        options: &KeyOptions,
    ) -> StoreResult<Option<StoreValue>> {
        let value = value.into();
        self.instrument("write", name, async {
            match value {
                Value::Scalar(scalar) => {
                    let key = self.key(name, options);
                    if !self.store.set(&key, &scalar).await? {
                        return Ok(None);
                    }
                    self.apply_write_expiry(&key, options).await?;
                    Ok(Some(StoreValue::Scalar(scalar)))
                }
                Value::Hash(fields) => Ok(self
                    .store_hash(name, &fields, options)
                    .await?
                    .map(StoreValue::Hash)),
            }
        })
        .await
    }

    /// Writes several scalars in one multi-set.
    ///
    /// Returns the written values keyed by logical name, or `None` if the
    /// store rejected the write.
    pub async fn write_many<I, K, V>(
        &self,
        entries: I,
        options: &KeyOptions,
    ) -> StoreResult<Option<IndexMap<String, String>>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let entries: Vec<(String, String)> = entries
            .into_iter()
            .map(|(name, value)| (name.as_ref().to_owned(), value.into()))
            .collect();
        let names = entries
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let pairs: Vec<(String, String)> = entries
            .into_iter()
            .map(|(name, value)| (self.key(&name, options), value))
            .collect();
        self.instrument("write_many", &names, async {
            if pairs.is_empty() {
                return Ok(Some(IndexMap::new()));
            }
            if !self.store.mset(&pairs).await? {
                return Ok(None);
            }
            for (key, _) in &pairs {
                self.apply_write_expiry(key, options).await?;
            }
            let prefix = self.resolver.resolve_prefix(options);
            Ok(Some(self.resolver.clean_keys(&prefix, pairs.clone(), options)))
        })
        .await
    }

    /// Reads `name` as a scalar, a hash, or nothing.
    pub async fn read(&self, name: &str, options: &KeyOptions) -> StoreResult<StoreValue> {
        self.instrument("read", name, async {
            self.store.value(&self.key(name, options)).await
        })
        .await
    }

    /// Reads several names with one multi-get.
    ///
    /// Entries the multi-get reports as empty are probed again as hashes.
    /// The result is keyed by logical name, sorted by name.
    pub async fn read_many<I, S>(
        &self,
        names: I,
        options: &KeyOptions,
    ) -> StoreResult<IndexMap<String, StoreValue>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = names.into_iter().map(|name| name.as_ref().to_owned()).collect();
        self.instrument("read_many", &names.join(","), async {
            let keys = self.resolver.resolve_keys(&names, options);
            if keys.is_empty() {
                return Ok(IndexMap::new());
            }
            let values = self.store.mget(&keys).await?;
            let mut result = IndexMap::with_capacity(names.len());
            for ((name, key), value) in names.iter().zip(&keys).zip(values) {
                let value = match value {
                    Some(scalar) => StoreValue::Scalar(scalar),
                    None => self.store.value(key).await?,
                };
                result.insert(name.clone(), value);
            }
            result.sort_keys();
            Ok(result)
        })
        .await
    }

    /// Deletes `name`. Returns whether it existed.
    pub async fn delete(&self, name: &str, options: &KeyOptions) -> StoreResult<bool> {
        self.instrument("delete", name, async {
            let key = self.key(name, options);
            Ok(self.store.del(&[key]).await? > 0)
        })
        .await
    }

    /// Adds `by` to the counter under `name`, returning the new value.
    pub async fn increment(&self, name: &str, by: i64, options: &KeyOptions) -> StoreResult<i64> {
        self.instrument("increment", name, async {
            let key = self.key(name, options);
            let value = self.store.incr_by(&key, by).await?;
            self.apply_expiry(&key, options).await?;
            Ok(value)
        })
        .await
    }

    /// Subtracts `by` from the counter under `name`, returning the new value.
    ///
    /// Fails with [`StoreError::InvalidArgument`] for `i64::MIN`, which has no
    /// positive counterpart.
    pub async fn decrement(&self, name: &str, by: i64, options: &KeyOptions) -> StoreResult<i64> {
        self.instrument("decrement", name, async {
            let delta = by.checked_neg().ok_or_else(|| {
                StoreError::InvalidArgument(format!("cannot decrement by {by}"))
            })?;
            let key = self.key(name, options);
            let value = self.store.incr_by(&key, delta).await?;
            self.apply_expiry(&key, options).await?;
            Ok(value)
        })
        .await
    }

    // Hashes

    async fn store_hash(
        &self,
        name: &str,
        fields: &FieldValues,
        options: &KeyOptions,
    ) -> StoreResult<Option<Hash>> {
        let key = self.key(name, options);
        if !self.store.hset_multiple(&key, &fields.to_pairs()).await? {
            return Ok(None);
        }
        self.apply_write_expiry(&key, options).await?;
        Ok(Some(self.store.hget_all(&key).await?))
    }

    /// Sets several hash fields, then returns the whole hash as stored.
    ///
    /// Returns `None` if the store rejected the write.
    pub async fn write_hash(
        &self,
        name: &str,
        fields: impl Into<FieldValues>,
        options: &KeyOptions,
    ) -> StoreResult<Option<Hash>> {
        let fields = fields.into();
        self.instrument("write_hash", name, self.store_hash(name, &fields, options))
            .await
    }

    async fn apply_deltas(
        &self,
        name: &str,
        fields: FieldValues,
        options: &KeyOptions,
    ) -> StoreResult<IndexMap<String, FieldValue>> {
        let key = self.key(name, options);
        let mut result = IndexMap::with_capacity(fields.len());
        for (field, delta) in fields {
            let value = match delta {
                FieldValue::Int(delta) => {
                    FieldValue::Int(self.store.hincr_by(&key, &field, delta).await?)
                }
                FieldValue::Float(delta) => {
                    FieldValue::Float(self.store.hincr_by_float(&key, &field, delta).await?)
                }
                FieldValue::Text(text) => {
                    warn!(key, field, "non-numeric hash increment, overwriting field");
                    self.store
                        .hset_multiple(&key, &[(field.clone(), text.clone())])
                        .await?;
                    let stored = self.store.hget(&key, &field).await?;
                    FieldValue::Text(stored.unwrap_or(text))
                }
            };
            result.insert(field, value);
        }
        self.apply_expiry(&key, options).await?;
        Ok(result)
    }

    /// Increments hash fields by their numeric values.
    ///
    /// Integers use integer increments and floats use float increments,
    /// whether given as numbers or as text such as `"5"`. Other text
    /// overwrites the field instead. A bare field name increments
    /// that field by one. Returns the new value of every touched field.
    pub async fn increment_hash(
        &self,
        name: &str,
        fields: impl Into<FieldValues>,
        options: &KeyOptions,
    ) -> StoreResult<IndexMap<String, FieldValue>> {
        let fields = fields.into().numeric();
        self.instrument("increment_hash", name, self.apply_deltas(name, fields, options))
            .await
    }

    /// Decrements hash fields by their numeric values. See
    /// [`KeyValueStore::increment_hash`].
    ///
    /// Fails with [`StoreError::InvalidArgument`] if a delta is `i64::MIN`.
    pub async fn decrement_hash(
        &self,
        name: &str,
        fields: impl Into<FieldValues>,
        options: &KeyOptions,
    ) -> StoreResult<IndexMap<String, FieldValue>> {
        let fields = fields.into().numeric().negate();
        self.instrument("decrement_hash", name, async {
            let fields = fields.ok_or_else(|| {
                StoreError::InvalidArgument("cannot decrement a hash field by i64::MIN".to_owned())
            })?;
            self.apply_deltas(name, fields, options).await
        })
        .await
    }

    /// Reads a hash.
    ///
    /// No fields reads the whole hash. One field reads that field unwrapped,
    /// several read a field map; missing fields read as `None`.
    pub async fn read_hash(
        &self,
        name: &str,
        fields: &[&str],
        options: &KeyOptions,
    ) -> StoreResult<HashRead> {
        self.instrument("read_hash", name, async {
            let key = self.key(name, options);
            if fields.is_empty() {
                return Ok(HashRead::All(self.store.hget_all(&key).await?));
            }
            let mut entries = Vec::with_capacity(fields.len());
            for field in fields {
                entries.push((field.to_string(), self.store.hget(&key, field).await?));
            }
            Ok(HashRead::Fields(Flattened::from_entries(entries)))
        })
        .await
    }

    /// Deletes hash fields, reporting per field whether it existed.
    pub async fn delete_from_hash(
        &self,
        name: &str,
        fields: &[&str],
        options: &KeyOptions,
    ) -> StoreResult<Flattened<bool>> {
        self.instrument("delete_from_hash", name, async {
            let key = self.key(name, options);
            let mut entries = Vec::with_capacity(fields.len());
            for field in fields {
                let removed = self.store.hdel(&key, &[field.to_string()]).await? > 0;
                entries.push((field.to_string(), removed));
            }
            Ok(Flattened::from_entries(entries))
        })
        .await
    }

    /// Number of fields in a hash.
    pub async fn hash_length(&self, name: &str, options: &KeyOptions) -> StoreResult<u64> {
        self.instrument("hash_length", name, async {
            self.store.hlen(&self.key(name, options)).await
        })
        .await
    }

    /// Sum of a hash's numeric values. Non-numeric values count as zero.
    pub async fn hash_sum(&self, name: &str, options: &KeyOptions) -> StoreResult<f64> {
        self.instrument("hash_sum", name, async {
            let values = self.store.hvals(&self.key(name, options)).await?;
            Ok(values
                .iter()
                .filter_map(|value| FieldValue::classify(value).as_f64())
                .sum())
        })
        .await
    }

    /// Values of a hash, in field order.
    pub async fn hash_values(&self, name: &str, options: &KeyOptions) -> StoreResult<Vec<String>> {
        self.instrument("hash_values", name, async {
            self.store.hvals(&self.key(name, options)).await
        })
        .await
    }

    // Search

    async fn search(&self, pattern: &str, options: &KeyOptions) -> StoreResult<Vec<String>> {
        let search = self.key(pattern, options);
        debug!(search, "search keys");
        self.store.keys(&search).await
    }

    /// Names matching a glob pattern.
    ///
    /// Returned names are stripped of the resolved prefix unless
    /// `options.raw` is set.
    pub async fn find(&self, pattern: &str, options: &KeyOptions) -> StoreResult<Vec<String>> {
        self.instrument("find", pattern, async {
            let keys = self.search(pattern, options).await?;
            let prefix = self.resolver.resolve_prefix(options);
            Ok(self.resolver.clean_names(&prefix, keys, options))
        })
        .await
    }

    /// Names matching a glob pattern together with their values.
    ///
    /// Hash matches are read in full.
    pub async fn fetch(
        &self,
        pattern: &str,
        options: &KeyOptions,
    ) -> StoreResult<IndexMap<String, StoreValue>> {
        self.instrument("fetch", pattern, async {
            let keys = self.search(pattern, options).await?;
            let mut values = Vec::with_capacity(keys.len());
            for key in keys {
                let value = self.store.value(&key).await?;
                values.push((key, value));
            }
            let prefix = self.resolver.resolve_prefix(options);
            Ok(self.resolver.clean_keys(&prefix, values, options))
        })
        .await
    }

    /// Removes every key of the current database.
    pub async fn clear(&self) -> StoreResult<()> {
        self.instrument("clear", "*", self.store.flush()).await
    }

    // Lists

    /// Pushes values onto one end of the list under `name`, returning the new
    /// length. With `only_if_exists` a missing list is left alone and `0` is
    /// returned.
    pub async fn list_push(
        &self,
        name: &str,
        values: &[String],
        end: ListEnd,
        only_if_exists: bool,
        options: &KeyOptions,
    ) -> StoreResult<u64> {
        self.instrument("list_push", name, async {
            let key = self.key(name, options);
            let length = self.store.push(&key, values, end, only_if_exists).await?;
            if length > 0 {
                self.apply_expiry(&key, options).await?;
            }
            Ok(length)
        })
        .await
    }

    /// Elements of a list between `start` and `stop`, inclusive.
    pub async fn list_range(
        &self,
        name: &str,
        start: i64,
        stop: i64,
        options: &KeyOptions,
    ) -> StoreResult<Vec<String>> {
        self.instrument("list_range", name, async {
            self.store.lrange(&self.key(name, options), start, stop).await
        })
        .await
    }

    /// Replaces the list element at `index`.
    pub async fn list_set(
        &self,
        name: &str,
        index: i64,
        value: &str,
        options: &KeyOptions,
    ) -> StoreResult<bool> {
        self.instrument("list_set", name, async {
            self.store.lset(&self.key(name, options), index, value).await
        })
        .await
    }

    /// Removes and returns an element from one end of a list, optionally
    /// waiting up to `timeout` for one to appear.
    pub async fn list_pop(
        &self,
        name: &str,
        end: ListEnd,
        timeout: Option<Duration>,
        options: &KeyOptions,
    ) -> StoreResult<Option<String>> {
        self.instrument("list_pop", name, async {
            let key = self.key(name, options);
            match timeout {
                Some(timeout) => self.store.blocking_pop(&key, end, timeout).await,
                None => self.store.pop(&key, end).await,
            }
        })
        .await
    }

    /// Length of a list.
    pub async fn list_length(&self, name: &str, options: &KeyOptions) -> StoreResult<u64> {
        self.instrument("list_length", name, async {
            self.store.llen(&self.key(name, options)).await
        })
        .await
    }
}
