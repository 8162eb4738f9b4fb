//! Key expiration.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// When a written key should expire.
///
/// Stores only understand absolute expiry, so relative durations are turned
/// into a unix timestamp at the moment the write happens.
///
/// ```
/// use std::time::Duration;
/// use chrono::{TimeZone, Utc};
/// use strata_core::Expiry;
///
/// let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
/// assert_eq!(Expiry::In(Duration::from_secs(60)).timestamp(now), 1_700_000_060);
/// assert_eq!(Expiry::At(now).timestamp(now), 1_700_000_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expiry {
    /// Expire at an absolute point in time.
    At(DateTime<Utc>),
    /// Expire after a duration, counted from the write.
    In(Duration),
}

impl Expiry {
    /// Unix timestamp (seconds) at which the key expires, relative to `now`.
    pub fn timestamp(&self, now: DateTime<Utc>) -> i64 {
        match self {
            Expiry::At(at) => at.timestamp(),
            Expiry::In(duration) => {
                let delta = TimeDelta::from_std(*duration).unwrap_or(TimeDelta::MAX);
                now.checked_add_signed(delta)
                    .map(|at| at.timestamp())
                    .unwrap_or(i64::MAX)
            }
        }
    }

    /// Unix timestamp at which the key expires, relative to the current time.
    pub fn timestamp_from_now(&self) -> i64 {
        self.timestamp(Utc::now())
    }
}

impl From<Duration> for Expiry {
    fn from(duration: Duration) -> Self {
        Expiry::In(duration)
    }
}

impl From<DateTime<Utc>> for Expiry {
    fn from(at: DateTime<Utc>) -> Self {
        Expiry::At(at)
    }
}
