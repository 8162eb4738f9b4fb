//! Bucketed counters.
//!
//! [`Stats`] counts events in hashes, one hash per bucket:
//!
//! ```text
//! app:stats:global:requests      (default bucket)
//! app:stats:user:foo:requests    (bucket user => foo)
//! app:stats:year:2024:requests   (bucket year => 2024)
//! ```
//!
//! Every call fans out over the requested buckets and returns its results
//! under the flattening rule: one bucket unwrapped, several keyed by bucket
//! label.

use indexmap::IndexMap;
use strata_core::{Buckets, FieldValue, FieldValues, Flattened, Hash, HashRead, KeyOptions};

use crate::{KeyValueStore, StoreResult};

/// Namespace stats live under unless configured otherwise.
pub const NAMESPACE: &str = "stats";

/// Bucket used when a call names none.
pub const DEFAULT_BUCKET: &str = "global";

/// Bucketed hash counters.
#[derive(Debug, Clone)]
pub struct Stats {
    kv: KeyValueStore,
    namespace: String,
    default_bucket: String,
}

impl Stats {
    /// Creates a stats facade over `kv`.
    pub fn new(kv: KeyValueStore) -> Self {
        Self {
            kv,
            namespace: NAMESPACE.to_owned(),
            default_bucket: DEFAULT_BUCKET.to_owned(),
        }
    }

    /// Sets the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the bucket used when a call names none.
    pub fn with_default_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.default_bucket = bucket.into();
        self
    }

    /// The wrapped key/value store.
    pub fn kv(&self) -> &KeyValueStore {
        &self.kv
    }

    fn bucket_options(&self, buckets: Buckets, options: &KeyOptions) -> Vec<(String, KeyOptions)> {
        let separator = options
            .separator
            .as_deref()
            .unwrap_or(self.kv.resolver().separator());
        buckets
            .or_default_bucket(&self.default_bucket)
            .labels(separator)
            .into_iter()
            .map(|label| {
                let options = options
                    .clone()
                    .or_namespace(&self.namespace)
                    .prefix(label.as_str());
                (label, options)
            })
            .collect()
    }

    /// Increments counters in every bucket.
    ///
    /// A bare field name increments that field by one.
    pub async fn inc(
        &self,
        name: &str,
        fields: impl Into<FieldValues>,
        buckets: impl Into<Buckets>,
        options: &KeyOptions,
    ) -> StoreResult<Flattened<IndexMap<String, FieldValue>>> {
        let fields = fields.into();
        let mut results = Vec::new();
        for (label, options) in self.bucket_options(buckets.into(), options) {
            let counters = self.kv.increment_hash(name, fields.clone(), &options).await?;
            results.push((label, counters));
        }
        Ok(Flattened::from_entries(results))
    }

    /// Decrements counters in every bucket.
    pub async fn dec(
        &self,
        name: &str,
        fields: impl Into<FieldValues>,
        buckets: impl Into<Buckets>,
        options: &KeyOptions,
    ) -> StoreResult<Flattened<IndexMap<String, FieldValue>>> {
        let fields = fields.into();
        let mut results = Vec::new();
        for (label, options) in self.bucket_options(buckets.into(), options) {
            let counters = self.kv.decrement_hash(name, fields.clone(), &options).await?;
            results.push((label, counters));
        }
        Ok(Flattened::from_entries(results))
    }

    /// Reads counters from every bucket. No fields reads whole hashes.
    pub async fn get(
        &self,
        name: &str,
        fields: &[&str],
        buckets: impl Into<Buckets>,
        options: &KeyOptions,
    ) -> StoreResult<Flattened<HashRead>> {
        let mut results = Vec::new();
        for (label, options) in self.bucket_options(buckets.into(), options) {
            results.push((label, self.kv.read_hash(name, fields, &options).await?));
        }
        Ok(Flattened::from_entries(results))
    }

    /// Overwrites counters in every bucket, returning each resulting hash.
    pub async fn set(
        &self,
        name: &str,
        fields: impl Into<FieldValues>,
        buckets: impl Into<Buckets>,
        options: &KeyOptions,
    ) -> StoreResult<Flattened<Option<Hash>>> {
        let fields = fields.into();
        let mut results = Vec::new();
        for (label, options) in self.bucket_options(buckets.into(), options) {
            let hash = self.kv.write_hash(name, fields.clone(), &options).await?;
            results.push((label, hash));
        }
        Ok(Flattened::from_entries(results))
    }

    /// Deletes counters from every bucket. No fields deletes whole hashes.
    ///
    /// Returns how many hashes or fields were removed across all buckets.
    pub async fn delete(
        &self,
        name: &str,
        fields: &[&str],
        buckets: impl Into<Buckets>,
        options: &KeyOptions,
    ) -> StoreResult<u64> {
        let mut removed = 0;
        for (_, options) in self.bucket_options(buckets.into(), options) {
            if fields.is_empty() {
                removed += u64::from(self.kv.delete(name, &options).await?);
            } else {
                let deleted = self.kv.delete_from_hash(name, fields, &options).await?;
                removed += deleted.values().filter(|deleted| **deleted).count() as u64;
            }
        }
        Ok(removed)
    }

    /// Counter values of every bucket.
    pub async fn values(
        &self,
        name: &str,
        buckets: impl Into<Buckets>,
        options: &KeyOptions,
    ) -> StoreResult<Flattened<Vec<String>>> {
        let mut results = Vec::new();
        for (label, options) in self.bucket_options(buckets.into(), options) {
            results.push((label, self.kv.hash_values(name, &options).await?));
        }
        Ok(Flattened::from_entries(results))
    }

    /// Sum of the counters of every bucket.
    pub async fn sum(
        &self,
        name: &str,
        buckets: impl Into<Buckets>,
        options: &KeyOptions,
    ) -> StoreResult<Flattened<f64>> {
        let mut results = Vec::new();
        for (label, options) in self.bucket_options(buckets.into(), options) {
            results.push((label, self.kv.hash_sum(name, &options).await?));
        }
        Ok(Flattened::from_entries(results))
    }

    /// Number of counters in every bucket.
    pub async fn length(
        &self,
        name: &str,
        buckets: impl Into<Buckets>,
        options: &KeyOptions,
    ) -> StoreResult<Flattened<u64>> {
        let mut results = Vec::new();
        for (label, options) in self.bucket_options(buckets.into(), options) {
            results.push((label, self.kv.hash_length(name, &options).await?));
        }
        Ok(Flattened::from_entries(results))
    }

    /// Every counter of a single bucket, taken from `options.prefix`
    /// (the default bucket when unset).
    pub async fn fields(&self, name: &str, options: &KeyOptions) -> StoreResult<Hash> {
        let bucket = options
            .prefix
            .clone()
            .unwrap_or_else(|| self.default_bucket.clone());
        let options = options.clone().or_namespace(&self.namespace).prefix(bucket);
        match self.kv.read_hash(name, &[], &options).await? {
            HashRead::All(hash) => Ok(hash),
            HashRead::Fields(_) => Ok(Hash::new()),
        }
    }
}
