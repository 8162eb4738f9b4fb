#![warn(missing_docs)]
//! Store abstraction and the data structures built on it.
//!
//! If you want to implement your own store, implement [`Store`]. Everything
//! else in this crate works against `Arc<dyn Store>`:
//!
//! - [`KeyValueStore`]: scalars, hashes and lists under resolved keys.
//! - [`Leaderboard`]: ranking, paging and windows over a sorted set.
//! - [`Stats`]: bucketed hash counters.
//! - [`Lists`]: bucketed lists.
//!
//! Calls through [`KeyValueStore`] and [`Leaderboard`] can be observed with
//! [`middleware`].
mod error;
pub mod kv;
pub mod leaderboard;
pub mod lists;
pub mod middleware;
pub mod stats;
mod store;

pub use error::{StoreError, StoreResult};
pub use kv::KeyValueStore;
pub use leaderboard::{Entry, LeaderOptions, Leaderboard};
pub use lists::{ListItems, ListRange, Lists};
#[cfg(feature = "metrics")]
pub use middleware::MetricsMiddleware;
pub use middleware::{Middleware, Middlewares, TracingMiddleware};
pub use stats::Stats;
pub use store::{KeyType, ListEnd, SharedStore, Store};
