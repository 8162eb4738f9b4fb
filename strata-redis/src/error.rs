//! Error types for Redis store operations.
//!
//! Every error converts into [`StoreError`] so callers see the same error
//! type whichever store they use. Connection failures map to
//! [`StoreError::Connection`], everything else to [`StoreError::Internal`].
//!
//! [`StoreError`]: strata_backend::StoreError
//! [`StoreError::Connection`]: strata_backend::StoreError::Connection
//! [`StoreError::Internal`]: strata_backend::StoreError::Internal

use redis::RedisError;
use strata_backend::StoreError;

/// Error type for Redis store operations.
///
/// # When You'll Encounter This
///
/// - [`RedisStoreBuilder::build`] with an invalid connection URL
/// - The first store call while Redis is unreachable (the connection is
///   established lazily)
/// - A command Redis answers with an error, e.g. `WRONGTYPE`
///
/// ```no_run
/// use strata_redis::RedisStore;
///
/// match RedisStore::builder().server("not-a-valid-url").build() {
///     Ok(_) => println!("configured"),
///     Err(error) => println!("failed: {error}"),
/// }
/// ```
///
/// [`RedisStoreBuilder::build`]: crate::RedisStoreBuilder::build
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An error from the underlying Redis client.
    #[error("Redis store error: {0}")]
    Redis(#[from] RedisError),
}

impl Error {
    /// Whether the error means Redis could not be reached.
    pub fn is_connection(&self) -> bool {
        match self {
            Error::Redis(error) => {
                error.is_io_error()
                    || error.is_connection_refusal()
                    || error.is_connection_dropped()
                    || error.is_timeout()
            }
        }
    }
}

impl From<Error> for StoreError {
    fn from(error: Error) -> Self {
        if error.is_connection() {
            Self::Connection(Box::new(error))
        } else {
            Self::Internal(Box::new(error))
        }
    }
}
