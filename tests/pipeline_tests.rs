//! Pipeline properties exercised through the public API

use crossbeam::channel::bounded;
use indexflow::parallel::{self, CancellationSignal, OrderedResults, Pipeline};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Fail instead of hanging when a run deadlocks
fn with_watchdog<R, F>(timeout: Duration, f: F) -> R
where
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
{
    let (tx, rx) = bounded(1);
    std::thread::spawn(move || {
        let _ = tx.send(f());
    });
    rx.recv_timeout(timeout)
        .expect("pipeline did not terminate in time (leaked or deadlocked thread)")
}

fn square_run(items: usize, workers: usize) -> OrderedResults<u64> {
    with_watchdog(Duration::from_secs(10), move || {
        parallel::run(items, |v| v * v, workers).unwrap()
    })
}

#[test]
fn test_completeness_99_items_8_workers() {
    let results = square_run(99, 8);

    assert_eq!(results.len(), 100);
    assert_eq!(results[0], 0);
    for index in 1..=99 {
        let expected = (index * index) as u64;
        assert_eq!(results[index], expected, "slot {index}");
    }
    assert_eq!(results.filled_count(), 99);
    assert!(results.missing(1..100).is_empty());
    assert!(!results.cancelled());
}

#[test]
fn test_single_worker_is_complete() {
    let results = square_run(99, 1);
    assert_eq!(results, square_run(99, 8));
}

#[test]
fn test_empty_run_completes() {
    let results = square_run(0, 8);

    assert_eq!(results.len(), 1);
    assert_eq!(results.filled_count(), 0);
    assert!(!results.cancelled());
}

#[test]
fn test_more_workers_than_items() {
    let results = square_run(3, 16);
    assert_eq!(results.as_slice(), &[0, 1, 4, 9]);
}

#[test]
fn test_order_independent_of_interleaving() {
    // Opposite per-item delays force opposite completion orders
    let slow_low = with_watchdog(Duration::from_secs(20), || {
        parallel::run(
            40,
            |v| {
                std::thread::sleep(Duration::from_millis(40 - v));
                v * 3
            },
            8,
        )
        .unwrap()
    });
    let slow_high = with_watchdog(Duration::from_secs(20), || {
        parallel::run(
            40,
            |v| {
                std::thread::sleep(Duration::from_millis(v));
                v * 3
            },
            8,
        )
        .unwrap()
    });

    assert_eq!(slow_low, slow_high);
    assert_eq!(slow_low[40], 120);
}

#[test]
fn test_merged_stream_has_no_duplicates() {
    let (indices, stats) = with_watchdog(Duration::from_secs(10), || {
        Pipeline::with_workers(8)
            .run_with(0..500u64, |v: u64| v, |stream| {
                stream.map(|item| item.index).collect::<Vec<_>>()
            })
            .unwrap()
    });

    let unique: HashSet<_> = indices.iter().copied().collect();
    assert_eq!(unique.len(), indices.len());
    assert_eq!(indices.len(), 500);
    assert_eq!(stats.forwarded, 500);
    assert_eq!(stats.total_processed(), 500);
}

#[test]
fn test_external_cancellation_terminates() {
    let report = with_watchdog(Duration::from_secs(10), || {
        let pipeline = Pipeline::with_workers(4);
        let signal = pipeline.cancellation();

        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            signal.cancel()
        });

        let report = pipeline
            .execute(0..100_000usize, |v| {
                std::thread::sleep(Duration::from_millis(1));
                v
            })
            .unwrap();

        assert!(canceller.join().unwrap());
        report
    });

    assert!(report.results.cancelled());
    assert!(report.stats.cancelled);
    assert!(report.results.filled_count() < 100_000);
    assert_eq!(report.results.len(), 100_001);
}

#[test]
fn test_cancel_before_start() {
    let signal = CancellationSignal::new();
    signal.cancel();

    let report = with_watchdog(Duration::from_secs(10), move || {
        Pipeline::with_workers(8)
            .with_cancellation(signal)
            .execute(0..50usize, |v| v)
            .unwrap()
    });

    assert!(report.results.cancelled());
    assert_eq!(report.results.filled_count(), 0);
    assert_eq!(report.stats.emitted, 0);
}

#[test]
fn test_double_cancellation_is_harmless() {
    let report = with_watchdog(Duration::from_secs(10), || {
        let pipeline = Pipeline::with_workers(2);
        let signal = pipeline.cancellation();
        assert!(signal.cancel());
        assert!(!signal.cancel());

        let report = pipeline.execute(0..10usize, |v| v).unwrap();
        assert!(!signal.cancel());
        report
    });

    assert!(report.results.cancelled());
}

#[test]
fn test_completed_run_leaves_shared_signal_clear() {
    let signal = CancellationSignal::new();

    let (first, second, signal) = with_watchdog(Duration::from_secs(10), move || {
        let first = Pipeline::with_workers(4)
            .with_cancellation(signal.clone())
            .execute(0..10usize, |v| v * 2)
            .unwrap();
        let second = Pipeline::with_workers(4)
            .with_cancellation(signal.clone())
            .execute(0..10usize, |v| v * 2)
            .unwrap();
        (first, second, signal)
    });

    assert!(!first.results.cancelled());
    assert!(!signal.is_cancelled());
    assert!(!second.results.cancelled());
    assert!(!second.stats.cancelled);
    assert_eq!(second.results.filled_count(), 10);
    assert!(signal.cancel());
}

#[test]
fn test_own_handle_stays_usable_after_run() {
    let pipeline = Pipeline::with_workers(2);
    let handle = pipeline.cancellation();

    let report = with_watchdog(Duration::from_secs(10), move || {
        pipeline.execute(0..5usize, |v| v).unwrap()
    });

    assert!(!report.results.cancelled());
    assert!(!handle.is_cancelled());
    assert!(handle.cancel());
}

#[test]
fn test_abandonment_does_not_cancel_caller_signal() {
    let signal = CancellationSignal::new();
    let shared = signal.clone();

    let (_, stats) = with_watchdog(Duration::from_secs(10), move || {
        Pipeline::with_workers(4)
            .with_cancellation(shared)
            .run_with(0..100_000u64, |v: u64| v, |mut stream| stream.next())
            .unwrap()
    });

    assert!(stats.cancelled);
    assert!(!signal.is_cancelled());
}

#[test]
fn test_consumer_abandonment_terminates() {
    let (first, stats) = with_watchdog(Duration::from_secs(10), || {
        Pipeline::with_workers(8)
            .run_with(0..1_000_000u64, |v: u64| v, |mut stream| stream.next())
            .unwrap()
    });

    assert!(first.is_some());
    assert!(stats.cancelled);
    assert!(stats.emitted < 1_000_000);
}

#[test]
fn test_panicking_transform_surfaces_error() {
    let err = with_watchdog(Duration::from_secs(10), || {
        Pipeline::with_workers(4)
            .execute(0..1_000usize, |v| {
                if v == 17 {
                    panic!("cannot transform 17");
                }
                v
            })
            .unwrap_err()
    });

    assert!(err.to_string().contains("Thread panic"));
}

#[test]
fn test_all_workers_exit_after_run() {
    let calls = AtomicUsize::new(0);

    let report = Pipeline::with_workers(6)
        .first_index(0)
        .execute(0..64usize, |v| {
            calls.fetch_add(1, Ordering::Relaxed);
            v + 1
        })
        .unwrap();

    assert_eq!(calls.load(Ordering::Relaxed), 64);
    assert_eq!(report.stats.processed.len(), 6);
    assert_eq!(report.results.as_slice(), (1..=64).collect::<Vec<_>>().as_slice());
}
