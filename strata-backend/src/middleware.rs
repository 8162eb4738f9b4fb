//! Call middleware.
//!
//! Every public operation of [`KeyValueStore`](crate::KeyValueStore) and
//! [`Leaderboard`](crate::Leaderboard) runs through an ordered list of
//! [`Middleware`]s. For each call:
//!
//! 1. `before` hooks run in registration order,
//! 2. the operation runs,
//! 3. `after` hooks run in reverse registration order.
//!
//! [`Stats`](crate::Stats) and [`Lists`](crate::Lists) are observed through
//! the key/value store they wrap.
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use strata_backend::middleware::{Call, Middleware, Middlewares, Outcome};
//! use strata_core::StoreLabel;
//!
//! struct Record(Arc<Mutex<Vec<String>>>);
//!
//! impl Middleware for Record {
//!     fn before(&self, call: &Call<'_>) {
//!         self.0.lock().unwrap().push(format!("{}.{}", call.component, call.operation));
//!     }
//! }
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let middlewares = Middlewares::new().with(Record(seen.clone()));
//! let store = StoreLabel::new_static("memory");
//! let call = Call::new("kv", "read", "key", &store);
//!
//! # tokio_test_block(async {
//! let value: Result<u8, strata_backend::StoreError> =
//!     middlewares.run(call, async { Ok(1) }).await;
//! assert_eq!(value.unwrap(), 1);
//! # });
//! assert_eq!(seen.lock().unwrap().as_slice(), ["kv.read"]);
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::{fmt, future::Future, sync::Arc, time::Duration, time::Instant};

use strata_core::StoreLabel;
use tracing::{debug, warn};

use crate::{StoreError, StoreResult};

/// One instrumented call.
#[derive(Debug, Clone, Copy)]
pub struct Call<'a> {
    /// Component name, e.g. `kv` or `leaderboard`.
    pub component: &'static str,
    /// Operation name, e.g. `write_hash`.
    pub operation: &'static str,
    /// Logical key the call operates on.
    pub key: &'a str,
    /// Store the call is sent to.
    pub store: &'a StoreLabel,
}

impl<'a> Call<'a> {
    /// Describes a call.
    pub fn new(
        component: &'static str,
        operation: &'static str,
        key: &'a str,
        store: &'a StoreLabel,
    ) -> Self {
        Self {
            component,
            operation,
            key,
            store,
        }
    }
}

/// How an instrumented call ended.
#[derive(Debug, Clone, Copy)]
pub struct Outcome<'a> {
    /// Wall time spent in the operation.
    pub elapsed: Duration,
    /// The error, if the operation failed.
    pub error: Option<&'a StoreError>,
}

impl Outcome<'_> {
    /// Whether the operation succeeded.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Hooks run around every instrumented call.
pub trait Middleware: Send + Sync {
    /// Runs before the operation.
    fn before(&self, _call: &Call<'_>) {}

    /// Runs after the operation.
    fn after(&self, _call: &Call<'_>, _outcome: &Outcome<'_>) {}
}

/// Ordered list of middlewares.
#[derive(Clone, Default)]
pub struct Middlewares(Vec<Arc<dyn Middleware>>);

impl Middlewares {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware.
    pub fn push(&mut self, middleware: impl Middleware + 'static) {
        self.0.push(Arc::new(middleware));
    }

    /// Appends an already shared middleware.
    pub fn push_shared(&mut self, middleware: Arc<dyn Middleware>) {
        self.0.push(middleware);
    }

    /// Appends a middleware, builder style.
    pub fn with(mut self, middleware: impl Middleware + 'static) -> Self {
        self.push(middleware);
        self
    }

    /// Number of registered middlewares.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no middleware is registered.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Runs `operation` wrapped in every middleware.
    pub async fn run<T, F>(&self, call: Call<'_>, operation: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        if self.0.is_empty() {
            return operation.await;
        }
        for middleware in &self.0 {
            middleware.before(&call);
        }
        let started = Instant::now();
        let result = operation.await;
        let outcome = Outcome {
            elapsed: started.elapsed(),
            error: result.as_ref().err(),
        };
        for middleware in self.0.iter().rev() {
            middleware.after(&call, &outcome);
        }
        result
    }
}

impl fmt::Debug for Middlewares {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middlewares")
            .field("len", &self.0.len())
            .finish()
    }
}

/// Emits one `tracing` event per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn after(&self, call: &Call<'_>, outcome: &Outcome<'_>) {
        match outcome.error {
            None => debug!(
                component = call.component,
                operation = call.operation,
                key = call.key,
                store = %call.store,
                elapsed_us = outcome.elapsed.as_micros() as u64,
                "store call"
            ),
            Some(error) => warn!(
                component = call.component,
                operation = call.operation,
                key = call.key,
                store = %call.store,
                elapsed_us = outcome.elapsed.as_micros() as u64,
                %error,
                "store call failed"
            ),
        }
    }
}

#[cfg(feature = "metrics")]
pub use self::metrics_middleware::*;

#[cfg(feature = "metrics")]
mod metrics_middleware {
    use lazy_static::lazy_static;

    use super::{Call, Middleware, Outcome};

    lazy_static! {
        /// Metric name for total calls counter.
        pub static ref STORE_CALLS_TOTAL: &'static str = {
            metrics::describe_counter!(
                "strata_store_total",
                "Total number of store calls per component and operation."
            );
            "strata_store_total"
        };

        /// Metric name for failed calls counter.
        pub static ref STORE_ERRORS_TOTAL: &'static str = {
            metrics::describe_counter!(
                "strata_store_errors_total",
                "Total number of failed store calls per component and operation."
            );
            "strata_store_errors_total"
        };

        /// Metric name for call duration histogram.
        pub static ref STORE_DURATION: &'static str = {
            metrics::describe_histogram!(
                "strata_store_duration_seconds",
                metrics::Unit::Seconds,
                "Duration of store calls in seconds."
            );
            "strata_store_duration_seconds"
        };
    }

    /// Records call counts, errors and durations with the `metrics` crate.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct MetricsMiddleware;

    impl Middleware for MetricsMiddleware {
        fn after(&self, call: &Call<'_>, outcome: &Outcome<'_>) {
            let store = call.store.to_string();
            metrics::counter!(
                *STORE_CALLS_TOTAL,
                "component" => call.component,
                "operation" => call.operation,
                "store" => store.clone()
            )
            .increment(1);
            metrics::histogram!(
                *STORE_DURATION,
                "component" => call.component,
                "operation" => call.operation,
                "store" => store.clone()
            )
            .record(outcome.elapsed.as_secs_f64());
            if !outcome.is_ok() {
                metrics::counter!(
                    *STORE_ERRORS_TOTAL,
                    "component" => call.component,
                    "operation" => call.operation,
                    "store" => store
                )
                .increment(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware for Recorder {
        fn before(&self, call: &Call<'_>) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:before:{}", self.name, call.operation));
        }

        fn after(&self, call: &Call<'_>, outcome: &Outcome<'_>) {
            self.log.lock().unwrap().push(format!(
                "{}:after:{}:{}",
                self.name,
                call.operation,
                outcome.is_ok()
            ));
        }
    }

    fn block_on<F: Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(future)
    }

    #[test]
    fn test_hook_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let middlewares = Middlewares::new()
            .with(Recorder { name: "outer", log: log.clone() })
            .with(Recorder { name: "inner", log: log.clone() });
        let label = StoreLabel::new_static("test");

        let result: StoreResult<()> =
            block_on(middlewares.run(Call::new("kv", "write", "k", &label), async { Ok(()) }));
        assert!(result.is_ok());

        assert_eq!(
            log.lock().unwrap().as_slice(),
            [
                "outer:before:write",
                "inner:before:write",
                "inner:after:write:true",
                "outer:after:write:true",
            ]
        );
    }

    #[test]
    fn test_failed_outcome() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let middlewares = Middlewares::new().with(Recorder { name: "m", log: log.clone() });
        let label = StoreLabel::new_static("test");

        let result: StoreResult<()> = block_on(middlewares.run(
            Call::new("kv", "read", "k", &label),
            async { Err(StoreError::internal("boom")) },
        ));
        assert!(result.is_err());
        assert_eq!(log.lock().unwrap().last().map(String::as_str), Some("m:after:read:false"));
    }
}
