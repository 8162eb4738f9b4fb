//! Bucketed lists.
//!
//! Without buckets a [`Lists`] call works on `lists:<name>`; with buckets it
//! fans out to `lists:<bucket>:<name>` per bucket and flattens the results.

use std::time::Duration;

use indexmap::IndexMap;
use strata_core::{Buckets, Flattened, KeyOptions};

use crate::{KeyValueStore, ListEnd, StoreResult};

/// Namespace lists live under unless configured otherwise.
pub const NAMESPACE: &str = "lists";

/// Which elements of a list to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListRange {
    /// The whole list.
    #[default]
    All,
    /// A single element.
    Index(i64),
    /// Every element from an index to the end.
    From(i64),
    /// Elements between two indexes, inclusive.
    Between(i64, i64),
}

impl ListRange {
    fn bounds(self) -> (i64, i64) {
        match self {
            ListRange::All => (0, -1),
            ListRange::Index(index) => (index, index),
            ListRange::From(start) => (start, -1),
            ListRange::Between(start, stop) => (start, stop),
        }
    }
}

/// Elements read from one or more lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListItems {
    /// Elements of every bucket concatenated in bucket order.
    Merged(Vec<String>),
    /// Elements per bucket label.
    PerBucket(IndexMap<String, Vec<String>>),
}

impl ListItems {
    /// All elements in order, regardless of grouping.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            ListItems::Merged(items) => items,
            ListItems::PerBucket(groups) => groups.into_values().flatten().collect(),
        }
    }
}

/// Bucketed list operations.
#[derive(Debug, Clone)]
pub struct Lists {
    kv: KeyValueStore,
    namespace: String,
}

impl Lists {
    /// Creates a list facade over `kv`.
    pub fn new(kv: KeyValueStore) -> Self {
        Self {
            kv,
            namespace: NAMESPACE.to_owned(),
        }
    }

    /// Sets the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// The wrapped key/value store.
    pub fn kv(&self) -> &KeyValueStore {
        &self.kv
    }

    fn base_options(&self, options: &KeyOptions) -> KeyOptions {
        options.clone().or_namespace(&self.namespace)
    }

    fn bucket_options(&self, buckets: Buckets, options: &KeyOptions) -> Vec<(String, KeyOptions)> {
        let options = self.base_options(options);
        if buckets.is_empty() {
            let label = options.prefix.clone().unwrap_or_default();
            return vec![(label, options)];
        }
        let separator = options
            .separator
            .clone()
            .unwrap_or_else(|| self.kv.resolver().separator().to_owned());
        buckets
            .labels(&separator)
            .into_iter()
            .map(|label| {
                let options = options.clone().prefix(label.as_str());
                (label, options)
            })
            .collect()
    }

    async fn push<I, S>(
        &self,
        name: &str,
        values: I,
        buckets: Buckets,
        end: ListEnd,
        only_if_exists: bool,
        options: &KeyOptions,
    ) -> StoreResult<Flattened<u64>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        let mut results = Vec::new();
        for (label, options) in self.bucket_options(buckets, options) {
            let length = self
                .kv
                .list_push(name, &values, end, only_if_exists, &options)
                .await?;
            results.push((label, length));
        }
        Ok(Flattened::from_entries(results))
    }

    /// Appends values, returning each list's new length.
    pub async fn add<I, S>(
        &self,
        name: &str,
        values: I,
        buckets: impl Into<Buckets>,
        options: &KeyOptions,
    ) -> StoreResult<Flattened<u64>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(name, values, buckets.into(), ListEnd::Tail, false, options)
            .await
    }

    /// Appends values. Same as [`Lists::add`].
    pub async fn append<I, S>(
        &self,
        name: &str,
        values: I,
        buckets: impl Into<Buckets>,
        options: &KeyOptions,
    ) -> StoreResult<Flattened<u64>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(name, values, buckets.into(), ListEnd::Tail, false, options)
            .await
    }

    /// Prepends values.
    pub async fn prepend<I, S>(
        &self,
        name: &str,
        values: I,
        buckets: impl Into<Buckets>,
        options: &KeyOptions,
    ) -> StoreResult<Flattened<u64>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(name, values, buckets.into(), ListEnd::Head, false, options)
            .await
    }

    /// Appends values to lists that already exist. Missing lists report `0`.
    pub async fn add_if_exists<I, S>(
        &self,
        name: &str,
        values: I,
        buckets: impl Into<Buckets>,
        options: &KeyOptions,
    ) -> StoreResult<Flattened<u64>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(name, values, buckets.into(), ListEnd::Tail, true, options)
            .await
    }

    /// Appends values to lists that already exist. Same as
    /// [`Lists::add_if_exists`].
    pub async fn append_if_exists<I, S>(
        &self,
        name: &str,
        values: I,
        buckets: impl Into<Buckets>,
        options: &KeyOptions,
    ) -> StoreResult<Flattened<u64>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(name, values, buckets.into(), ListEnd::Tail, true, options)
            .await
    }

    /// Prepends values to lists that already exist.
    pub async fn prepend_if_exists<I, S>(
        &self,
        name: &str,
        values: I,
        buckets: impl Into<Buckets>,
        options: &KeyOptions,
    ) -> StoreResult<Flattened<u64>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(name, values, buckets.into(), ListEnd::Head, true, options)
            .await
    }

    /// Reads elements.
    ///
    /// With `merge` the elements of every bucket are concatenated in bucket
    /// order, otherwise they are grouped by bucket label.
    pub async fn get(
        &self,
        name: &str,
        range: ListRange,
        buckets: impl Into<Buckets>,
        merge: bool,
        options: &KeyOptions,
    ) -> StoreResult<ListItems> {
        let (start, stop) = range.bounds();
        let mut groups = IndexMap::new();
        for (label, options) in self.bucket_options(buckets.into(), options) {
            let items = self.kv.list_range(name, start, stop, &options).await?;
            groups.insert(label, items);
        }
        if merge {
            Ok(ListItems::Merged(groups.into_values().flatten().collect()))
        } else {
            Ok(ListItems::PerBucket(groups))
        }
    }

    /// Replaces the element at `index`.
    pub async fn set(
        &self,
        name: &str,
        index: i64,
        value: &str,
        options: &KeyOptions,
    ) -> StoreResult<bool> {
        self.kv
            .list_set(name, index, value, &self.base_options(options))
            .await
    }

    /// Replaces several elements, reporting per index whether it was set.
    pub async fn set_many<I, S>(
        &self,
        name: &str,
        values: I,
        options: &KeyOptions,
    ) -> StoreResult<IndexMap<i64, bool>>
    where
        I: IntoIterator<Item = (i64, S)>,
        S: AsRef<str>,
    {
        let options = self.base_options(options);
        let mut results = IndexMap::new();
        for (index, value) in values {
            let set = self.kv.list_set(name, index, value.as_ref(), &options).await?;
            results.insert(index, set);
        }
        Ok(results)
    }

    /// Removes and returns the first element, optionally waiting up to
    /// `timeout` for one.
    pub async fn pop(
        &self,
        name: &str,
        timeout: Option<Duration>,
        options: &KeyOptions,
    ) -> StoreResult<Option<String>> {
        self.kv
            .list_pop(name, ListEnd::Head, timeout, &self.base_options(options))
            .await
    }

    /// Removes and returns the last element, optionally waiting up to
    /// `timeout` for one.
    pub async fn pop_last(
        &self,
        name: &str,
        timeout: Option<Duration>,
        options: &KeyOptions,
    ) -> StoreResult<Option<String>> {
        self.kv
            .list_pop(name, ListEnd::Tail, timeout, &self.base_options(options))
            .await
    }

    /// Length of every bucket's list.
    pub async fn count(
        &self,
        name: &str,
        buckets: impl Into<Buckets>,
        options: &KeyOptions,
    ) -> StoreResult<Flattened<u64>> {
        let mut results = Vec::new();
        for (label, options) in self.bucket_options(buckets.into(), options) {
            results.push((label, self.kv.list_length(name, &options).await?));
        }
        Ok(Flattened::from_entries(results))
    }

    /// Same as [`Lists::count`].
    pub async fn size(
        &self,
        name: &str,
        buckets: impl Into<Buckets>,
        options: &KeyOptions,
    ) -> StoreResult<Flattened<u64>> {
        self.count(name, buckets, options).await
    }

    /// Same as [`Lists::count`].
    pub async fn length(
        &self,
        name: &str,
        buckets: impl Into<Buckets>,
        options: &KeyOptions,
    ) -> StoreResult<Flattened<u64>> {
        self.count(name, buckets, options).await
    }
}
