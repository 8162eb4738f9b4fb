#![warn(missing_docs)]
//! In-process [`Store`](strata_backend::Store) for strata.
//!
//! [`MemoryStore`] keeps strings, hashes, lists and sorted sets in a
//! [`DashMap`](dashmap::DashMap) and mirrors the Redis behaviour strata relies
//! on: missing keys read as empty, counters start at zero, ties in sorted sets
//! break on the member name, and expired keys disappear on next access.
//!
//! It needs no server, which makes it the store of choice for tests and for
//! local development.
mod error;
mod pattern;
mod store;

pub use error::Error;
pub use store::MemoryStore;
