//! Configuration errors.

use thiserror::Error;

/// Error type for loading configuration and building stores from it.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The YAML could not be parsed into a configuration.
    #[error("invalid configuration: {0}")]
    Parse(String),

    /// The configured store type is not compiled in, or could not be created.
    #[error("store not available: {0}")]
    StoreNotAvailable(String),

    /// The configuration asks for something this build was compiled without.
    #[error("feature `{0}` is not enabled")]
    FeatureNotEnabled(&'static str),
}
