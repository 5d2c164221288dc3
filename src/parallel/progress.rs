use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Pipeline counters tracked atomically across threads
#[derive(Debug, Default)]
pub struct RunCounters {
    emitted: AtomicUsize,
    forwarded: AtomicUsize,
    per_worker: Vec<AtomicUsize>, // Per-worker processed counts
}

impl RunCounters {
    pub fn new(worker_count: usize) -> Self {
        Self {
            emitted: AtomicUsize::new(0),
            forwarded: AtomicUsize::new(0),
            per_worker: (0..worker_count).map(|_| AtomicUsize::new(0)).collect(),
        }
    }

    pub fn record_emitted(&self) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the worker's running total
    pub fn record_processed(&self, worker_id: usize) -> usize {
        self.per_worker
            .get(worker_id)
            .map(|count| count.fetch_add(1, Ordering::Relaxed) + 1)
            .unwrap_or(0)
    }

    pub fn record_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn emitted(&self) -> usize {
        self.emitted.load(Ordering::Relaxed)
    }

    pub fn forwarded(&self) -> usize {
        self.forwarded.load(Ordering::Relaxed)
    }

    pub fn processed(&self) -> Vec<usize> {
        self.per_worker
            .iter()
            .map(|count| count.load(Ordering::Relaxed))
            .collect()
    }

    pub fn snapshot(&self, elapsed: Duration, cancelled: bool) -> RunStats {
        RunStats {
            workers: self.per_worker.len(),
            emitted: self.emitted(),
            processed: self.processed(),
            forwarded: self.forwarded(),
            elapsed,
            cancelled,
        }
    }
}

/// Summary of a finished pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub workers: usize,
    pub emitted: usize,
    pub processed: Vec<usize>,
    pub forwarded: usize,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    pub cancelled: bool,
}

impl RunStats {
    pub fn total_processed(&self) -> usize {
        self.processed.iter().sum()
    }
}

fn serialize_millis<S>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}
