#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod store;

pub use config::{
    Config, ENVIRONMENT_VARIABLE, Keys, LeaderboardConfig, ListsConfig, MiddlewareConfig,
    StatsConfig, resolve_environment,
};
pub use error::ConfigError;
pub use store::Store;
