use serde::{Deserialize, Serialize};
use strata_backend::SharedStore;

use crate::error::ConfigError;

/// In-process store settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Memory {
    /// Optional label for this store (used in metrics/tracing).
    #[serde(default)]
    pub label: Option<String>,
}

impl Memory {
    #[cfg(feature = "memory")]
    pub fn into_store(self) -> Result<SharedStore, ConfigError> {
        use std::sync::Arc;

        use strata_memory::MemoryStore;

        let mut store = MemoryStore::new();
        if let Some(label) = self.label {
            store = store.with_label(label);
        }
        Ok(Arc::new(store))
    }

    #[cfg(not(feature = "memory"))]
    pub fn into_store(self) -> Result<SharedStore, ConfigError> {
        Err(ConfigError::StoreNotAvailable("Memory".to_string()))
    }
}
