#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// Store trait and the built-in stores.
///
/// | Store | Feature | Use case |
/// |-------|---------|----------|
/// | [`RedisStore`](store::RedisStore) | `redis` | A Redis server |
/// | [`MemoryStore`](store::MemoryStore) | `memory` | Tests and single-process tools |
///
/// Implement [`Store`](store::Store) to plug in anything else.
pub mod store {
    pub use strata_backend::{KeyType, ListEnd, SharedStore, Store, StoreError, StoreResult};
    #[cfg(feature = "memory")]
    pub use strata_memory::MemoryStore;
    #[cfg(feature = "redis")]
    pub use strata_redis::{RedisStore, RedisStoreBuilder};
}

/// Call middleware for observing store operations.
pub mod middleware {
    #[cfg(feature = "metrics")]
    pub use strata_backend::MetricsMiddleware;
    pub use strata_backend::middleware::*;
}

pub use strata_backend::{
    Entry, KeyValueStore, LeaderOptions, Leaderboard, ListItems, ListRange, Lists, Stats,
    StoreError, StoreResult,
};
pub use strata_core::{
    Bucket, Buckets, Expiry, FieldValue, FieldValues, Flattened, Hash, HashRead, KeyOptions,
    KeyResolver, StoreLabel, StoreValue, Value,
};
