//! Metrics recorded by `MetricsMiddleware`.

#![cfg(feature = "metrics")]

use std::sync::Arc;

use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use metrics_util::{CompositeKey, MetricKind};
use strata_backend::{KeyValueStore, Leaderboard, MetricsMiddleware};
use strata_core::{KeyOptions, KeyResolver};
use strata_memory::MemoryStore;

type SnapshotEntry = (
    CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
);

fn label_matches(key: &CompositeKey, name: &str, value: &str) -> bool {
    key.key()
        .labels()
        .any(|label| label.key() == name && label.value() == value)
}

fn counter(entries: &[SnapshotEntry], name: &str, component: &str, operation: &str) -> Option<u64> {
    entries.iter().find_map(|(key, _, _, value)| {
        let matches = key.kind() == MetricKind::Counter
            && key.key().name() == name
            && label_matches(key, "component", component)
            && label_matches(key, "operation", operation);
        match value {
            DebugValue::Counter(count) if matches => Some(*count),
            _ => None,
        }
    })
}

fn histogram_samples(entries: &[SnapshotEntry], name: &str, operation: &str) -> usize {
    entries
        .iter()
        .filter(|(key, _, _, _)| {
            key.kind() == MetricKind::Histogram
                && key.key().name() == name
                && label_matches(key, "operation", operation)
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Histogram(samples) => samples.len(),
            _ => 0,
        })
        .sum()
}

fn run<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

#[test]
fn test_calls_and_durations_are_recorded() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        run(async {
            let kv = KeyValueStore::new(
                Arc::new(MemoryStore::new().with_label("primary")),
                KeyResolver::new("test"),
            )
            .with_middleware(MetricsMiddleware);
            let options = KeyOptions::new();

            kv.write("a", "1", &options).await.unwrap();
            kv.read("a", &options).await.unwrap();
            kv.read("b", &options).await.unwrap();

            let board = Leaderboard::new("scores", &kv);
            board.add_member("ann", 3.0).await.unwrap();
        })
    });

    let entries = snapshotter.snapshot().into_vec();

    assert_eq!(counter(&entries, "strata_store_total", "kv", "write"), Some(1));
    assert_eq!(counter(&entries, "strata_store_total", "kv", "read"), Some(2));
    assert_eq!(
        counter(&entries, "strata_store_total", "leaderboard", "add_member"),
        Some(1)
    );
    assert_eq!(counter(&entries, "strata_store_errors_total", "kv", "read"), None);
    assert_eq!(
        histogram_samples(&entries, "strata_store_duration_seconds", "read"),
        2
    );
    assert!(entries
        .iter()
        .all(|(key, _, _, _)| label_matches(key, "store", "primary")));
}

#[test]
fn test_errors_are_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        run(async {
            let kv = KeyValueStore::new(Arc::new(MemoryStore::new()), KeyResolver::new("test"))
                .with_middleware(MetricsMiddleware);
            let options = KeyOptions::new();

            kv.write_hash("h", [("f", "v")], &options).await.unwrap();
            assert!(kv.increment("h", 1, &options).await.is_err());
        })
    });

    let entries = snapshotter.snapshot().into_vec();

    assert_eq!(
        counter(&entries, "strata_store_errors_total", "kv", "increment"),
        Some(1)
    );
    assert_eq!(counter(&entries, "strata_store_total", "kv", "increment"), Some(1));
}
