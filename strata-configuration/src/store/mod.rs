//! Store selection.

use serde::{Deserialize, Serialize};
use strata_backend::SharedStore;

use crate::error::ConfigError;

mod memory;
mod redis;

pub use memory::Memory;
pub use redis::Redis;

/// The store every component talks to.
///
/// ```yaml
/// type: Redis
/// connection_string: "redis://127.0.0.1/1"
/// connect_retries: 3
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Store {
    Redis(Redis),
    Memory(Memory),
}

impl Default for Store {
    fn default() -> Self {
        Store::Redis(Redis::default())
    }
}

impl Store {
    /// Creates the configured store. Nothing is connected yet.
    pub fn into_store(self) -> Result<SharedStore, ConfigError> {
        match self {
            Store::Redis(config) => config.into_store(),
            Store::Memory(config) => config.into_store(),
        }
    }
}
