use serde::{Deserialize, Serialize};
use strata_backend::SharedStore;

use crate::error::ConfigError;

/// Redis store settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Redis {
    pub connection_string: String,
    /// Attempts made to open the connection before giving up.
    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,
    /// Optional label for this store (used in metrics/tracing).
    #[serde(default)]
    pub label: Option<String>,
}

fn default_connect_retries() -> u32 {
    3
}

impl Default for Redis {
    fn default() -> Self {
        Self {
            connection_string: "redis://127.0.0.1/".to_owned(),
            connect_retries: default_connect_retries(),
            label: None,
        }
    }
}

impl Redis {
    #[cfg(feature = "redis")]
    pub fn into_store(self) -> Result<SharedStore, ConfigError> {
        use std::sync::Arc;

        use strata_redis::RedisStore;

        let mut builder = RedisStore::builder()
            .server(self.connection_string)
            .connect_retries(self.connect_retries);

        if let Some(label) = self.label {
            builder = builder.label(label);
        }

        let store = builder
            .build()
            .map_err(|e| ConfigError::StoreNotAvailable(format!("Redis: {}", e)))?;

        Ok(Arc::new(store))
    }

    #[cfg(not(feature = "redis"))]
    pub fn into_store(self) -> Result<SharedStore, ConfigError> {
        Err(ConfigError::StoreNotAvailable("Redis".to_string()))
    }
}
