//! Error types for store operations.

use thiserror::Error;

/// Error type for store operations.
///
/// Lookups that find nothing are not errors: they come back as `None`,
/// `false` or [`StoreValue::Missing`](strata_core::StoreValue::Missing).
/// Rejected writes come back as a falsy result too. This enum only covers
/// failures a caller cannot express as a value.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached.
    ///
    /// Propagated unchanged; data operations never retry.
    #[error(transparent)]
    Connection(Box<dyn std::error::Error + Send + Sync>),

    /// The store answered with an error, e.g. an operation against a key
    /// holding the wrong kind of value.
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),

    /// The store answered with something that cannot be decoded.
    #[error("invalid store response: {0}")]
    InvalidResponse(String),

    /// The call's arguments cannot be turned into a store operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A leaderboard window was requested around a member that is not ranked.
    #[error("member `{member}` is not ranked in leaderboard `{leaderboard}`")]
    MemberNotFound {
        /// Leaderboard name.
        leaderboard: String,
        /// The missing member.
        member: String,
    },
}

impl StoreError {
    /// Wraps a store-side failure described by a message.
    pub fn internal(message: impl Into<String>) -> Self {
        let message: String = message.into();
        StoreError::Internal(message.into())
    }

    /// Whether the error is a connection failure.
    pub fn is_connection(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }
}

/// Result alias used by every store operation.
pub type StoreResult<T> = Result<T, StoreError>;
