//! Error types for the in-memory store.

use strata_backend::StoreError;

/// Errors raised by [`MemoryStore`](crate::MemoryStore), worded like the
/// Redis replies they stand in for.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The key holds a different kind of value.
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    /// An integer operation met a non-integer value or overflowed.
    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,

    /// A float operation met a non-float value or produced NaN/infinity.
    #[error("ERR value is not a valid float")]
    NotAFloat,

    /// The key does not exist.
    #[error("ERR no such key")]
    NoSuchKey,

    /// A list index is outside the list.
    #[error("ERR index out of range")]
    IndexOutOfRange,

    /// A key pattern could not be compiled.
    #[error("ERR invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl From<Error> for StoreError {
    fn from(error: Error) -> Self {
        Self::Internal(Box::new(error))
    }
}
