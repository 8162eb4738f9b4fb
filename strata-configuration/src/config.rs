//! Top-level configuration document.

use std::{path::Path, time::Duration};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strata_backend::{KeyValueStore, Leaderboard, Lists, Stats, TracingMiddleware, leaderboard, lists, stats};
use strata_core::{DEFAULT_ENVIRONMENT, DEFAULT_FORMAT, DEFAULT_SEPARATOR, Expiry, KeyResolver};

use crate::{error::ConfigError, store::Store};

/// Environment variable consulted when the configuration names no environment.
pub const ENVIRONMENT_VARIABLE: &str = "STRATA_ENV";

/// Key template settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Keys {
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_separator")]
    pub separator: String,
    /// Extra template tokens, e.g. `{:app}: shop`.
    #[serde(default)]
    pub replacements: IndexMap<String, String>,
}

fn default_format() -> String {
    DEFAULT_FORMAT.to_owned()
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_owned()
}

impl Default for Keys {
    fn default() -> Self {
        Self {
            format: default_format(),
            separator: default_separator(),
            replacements: IndexMap::new(),
        }
    }
}

/// Leaderboard defaults.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct LeaderboardConfig {
    #[serde(default = "default_leaderboard_namespace")]
    pub namespace: String,
    /// Values below one fall back to the default page size.
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_leaderboard_namespace() -> String {
    leaderboard::NAMESPACE.to_owned()
}

fn default_page_size() -> i64 {
    leaderboard::DEFAULT_PAGE_SIZE as i64
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            namespace: default_leaderboard_namespace(),
            page_size: default_page_size(),
        }
    }
}

/// Stats defaults.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct StatsConfig {
    #[serde(default = "default_stats_namespace")]
    pub namespace: String,
    #[serde(default = "default_bucket")]
    pub default_bucket: String,
}

fn default_stats_namespace() -> String {
    stats::NAMESPACE.to_owned()
}

fn default_bucket() -> String {
    stats::DEFAULT_BUCKET.to_owned()
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            namespace: default_stats_namespace(),
            default_bucket: default_bucket(),
        }
    }
}

/// Lists defaults.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ListsConfig {
    #[serde(default = "default_lists_namespace")]
    pub namespace: String,
}

fn default_lists_namespace() -> String {
    lists::NAMESPACE.to_owned()
}

impl Default for ListsConfig {
    fn default() -> Self {
        Self {
            namespace: default_lists_namespace(),
        }
    }
}

/// Which call middlewares to install.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct MiddlewareConfig {
    #[serde(default = "enabled")]
    pub tracing: bool,
    /// Needs the `metrics` feature.
    #[serde(default)]
    pub metrics: bool,
}

fn enabled() -> bool {
    true
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            tracing: true,
            metrics: false,
        }
    }
}

/// A complete strata configuration.
///
/// Every section is optional; missing sections take their defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Config {
    /// Falls back to `$STRATA_ENV`, then `development`.
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub keys: Keys,
    /// Default time to live of written keys, in seconds.
    #[serde(default)]
    pub expiry: Option<u64>,
    #[serde(default)]
    pub leaderboard: LeaderboardConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub lists: ListsConfig,
    #[serde(default)]
    pub middleware: MiddlewareConfig,
    #[serde(default)]
    pub store: Store,
}

impl Config {
    /// Parses a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_saphyr::from_str(yaml).map_err(|error| ConfigError::Parse(error.to_string()))
    }

    /// Reads and parses a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// The effective environment name.
    pub fn environment(&self) -> String {
        resolve_environment(
            self.environment.as_deref(),
            std::env::var(ENVIRONMENT_VARIABLE).ok(),
        )
    }

    /// Builds the key resolver.
    pub fn resolver(&self) -> KeyResolver {
        self.keys.replacements.iter().fold(
            KeyResolver::new(self.environment())
                .with_format(self.keys.format.as_str())
                .with_separator(self.keys.separator.as_str()),
            |resolver, (token, value)| resolver.with_replacement(token.as_str(), value.as_str()),
        )
    }

    /// The default expiry of written keys.
    pub fn expiry(&self) -> Option<Expiry> {
        self.expiry.map(|seconds| Expiry::In(Duration::from_secs(seconds)))
    }

    /// Builds a key/value store over the configured store, with the default
    /// expiry and middlewares applied.
    pub fn key_value_store(&self) -> Result<KeyValueStore, ConfigError> {
        let store = self.store.clone().into_store()?;
        let mut kv = KeyValueStore::new(store, self.resolver());
        if let Some(expiry) = self.expiry() {
            kv = kv.with_expiry(expiry);
        }
        if self.middleware.tracing {
            kv = kv.with_middleware(TracingMiddleware);
        }
        if self.middleware.metrics {
            kv = with_metrics(kv)?;
        }
        Ok(kv)
    }

    /// A leaderboard named `name` with the configured namespace and page size.
    pub fn leaderboard(&self, name: &str, kv: &KeyValueStore) -> Leaderboard {
        Leaderboard::new(name, kv)
            .with_namespace(self.leaderboard.namespace.as_str())
            .with_page_size(self.leaderboard.page_size)
    }

    /// Stats with the configured namespace and default bucket.
    pub fn stats(&self, kv: KeyValueStore) -> Stats {
        Stats::new(kv)
            .with_namespace(self.stats.namespace.as_str())
            .with_default_bucket(self.stats.default_bucket.as_str())
    }

    /// Lists with the configured namespace.
    pub fn lists(&self, kv: KeyValueStore) -> Lists {
        Lists::new(kv).with_namespace(self.lists.namespace.as_str())
    }
}

#[cfg(feature = "metrics")]
fn with_metrics(kv: KeyValueStore) -> Result<KeyValueStore, ConfigError> {
    Ok(kv.with_middleware(strata_backend::MetricsMiddleware))
}

#[cfg(not(feature = "metrics"))]
fn with_metrics(_kv: KeyValueStore) -> Result<KeyValueStore, ConfigError> {
    Err(ConfigError::FeatureNotEnabled("metrics"))
}

/// Picks the configured environment, then the one from the process
/// environment, then `development`. Empty names are skipped.
pub fn resolve_environment(configured: Option<&str>, from_env: Option<String>) -> String {
    configured
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .or(from_env.filter(|name| !name.is_empty()))
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_environment_order() {
        assert_eq!(resolve_environment(Some("prod"), Some("stage".into())), "prod");
        assert_eq!(resolve_environment(None, Some("stage".into())), "stage");
        assert_eq!(resolve_environment(Some(""), None), "development");
        assert_eq!(resolve_environment(None, Some(String::new())), "development");
    }
}
