use anyhow::{Context, Result};
use crossbeam::channel::{Receiver, bounded};
use crossbeam::select;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use super::merge::merge;
use super::progress::{RunCounters, RunStats};
use super::sequencer::{OrderedResults, Sequencer};
use super::signal::{CancelOnDrop, CancellationSignal};
use super::source;
use super::types::ResultItem;
use super::worker::WorkerPool;
use crate::config::PipelineConfig;

pub const DEFAULT_WORKERS: usize = 8;
pub const DEFAULT_FIRST_INDEX: usize = 1;
pub const DEFAULT_THREAD_PERCENTAGE: u8 = 75;

/// Source → worker pool → fan-in merge → consumer, run inside one thread scope
///
/// A pipeline observes one caller-facing [`CancellationSignal`], which only the
/// caller fires. Each run stops its stages through a private signal of its own,
/// so a run that completes leaves the caller's signal clear and reusable.
/// [`Pipeline::run_with`] and [`Pipeline::execute`] consume the pipeline.
#[derive(Debug)]
pub struct Pipeline {
    workers: usize,
    first_index: usize,
    signal: CancellationSignal,
}

/// Ordered results plus the statistics of the run that produced them
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport<U> {
    pub results: OrderedResults<U>,
    pub stats: RunStats,
}

/// Unordered stream of results handed to a [`Pipeline::run_with`] consumer
///
/// Iteration ends when every worker stream has closed, or as soon as the
/// pipeline is cancelled.
pub struct MergedStream<'a, U> {
    merged: Receiver<ResultItem<U>>,
    signal: &'a CancellationSignal,
    exhausted: &'a AtomicBool,
}

impl<U> Iterator for MergedStream<'_, U> {
    type Item = ResultItem<U>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.signal.is_cancelled() {
            return None;
        }

        select! {
            recv(self.merged) -> msg => match msg {
                Ok(item) => Some(item),
                Err(_) => {
                    self.exhausted.store(true, Ordering::Release);
                    None
                }
            },
            recv(self.signal.done()) -> _ => None,
        }
    }
}

impl Pipeline {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            workers: config.effective_workers(),
            first_index: config.first_index,
            signal: CancellationSignal::new(),
        }
    }

    /// Pipeline with `workers` workers (0 = derive from available cores)
    pub fn with_workers(workers: usize) -> Self {
        let workers = if workers == 0 {
            calculate_optimal_workers(0, DEFAULT_THREAD_PERCENTAGE)
        } else {
            workers
        };

        Self {
            workers,
            first_index: DEFAULT_FIRST_INDEX,
            signal: CancellationSignal::new(),
        }
    }

    pub fn first_index(mut self, first_index: usize) -> Self {
        self.first_index = first_index;
        self
    }

    /// Observe an externally owned signal instead of a private one
    pub fn with_cancellation(mut self, signal: CancellationSignal) -> Self {
        self.signal = signal;
        self
    }

    /// Handle that cancels this pipeline from any thread
    pub fn cancellation(&self) -> CancellationSignal {
        self.signal.clone()
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every stage and hand the merged, unordered stream to `consumer`.
    ///
    /// If the consumer returns before the stream is exhausted, or panics, the
    /// pipeline is cancelled so that all stages drain before this returns.
    pub fn run_with<T, U, I, F, C, R>(
        self,
        items: I,
        transform: F,
        consumer: C,
    ) -> Result<(R, RunStats)>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send,
        T: Send,
        U: Send,
        F: Fn(T) -> U + Sync,
        C: FnOnce(MergedStream<'_, U>) -> R,
    {
        let start = Instant::now();
        let pool = WorkerPool::new(self.workers);
        let counters = RunCounters::new(pool.workers());
        let exhausted = AtomicBool::new(false);
        let first_index = self.first_index;
        let items = items.into_iter();

        tracing::debug!(workers = pool.workers(), first_index, "pipeline starting");

        let run_signal = CancellationSignal::new();
        if self.signal.is_cancelled() {
            run_signal.cancel();
        }

        let external = &self.signal;
        let signal = &run_signal;
        let counters_ref = &counters;
        let pool_ref = &pool;
        let transform = &transform;
        let exhausted_ref = &exhausted;

        let (output, cancelled) = crossbeam::thread::scope(|s| -> Result<(R, bool)> {
            // Every exit from this closure, including unwinding, stops the stages
            let _shutdown = CancelOnDrop(signal);

            s.builder()
                .name("indexflow-cancel-relay".to_string())
                .spawn(move |_| external.relay_to(signal))
                .context("Failed to spawn cancel relay")?;

            let (input_tx, input_rx) = bounded(0);
            let outputs = pool_ref.spawn(s, input_rx, transform, signal, counters_ref)?;
            let merged = merge(s, outputs, signal, counters_ref)?;

            s.builder()
                .name("indexflow-source".to_string())
                .spawn(move |_| source::emit(items, first_index, input_tx, signal, counters_ref))
                .context("Failed to spawn source")?;

            let output = consumer(MergedStream {
                merged,
                signal,
                exhausted: exhausted_ref,
            });

            let cancelled = signal.is_cancelled() || !exhausted_ref.load(Ordering::Acquire);
            Ok((output, cancelled))
        })
        .map_err(|_| anyhow::anyhow!("Thread panic occurred during pipeline execution"))??;

        let stats = counters.snapshot(start.elapsed(), cancelled);
        if cancelled {
            tracing::warn!(
                forwarded = stats.forwarded,
                emitted = stats.emitted,
                "pipeline cancelled before completion"
            );
        }
        tracing::info!(
            workers = stats.workers,
            processed = stats.total_processed(),
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "pipeline finished"
        );

        Ok((output, stats))
    }

    /// Run the pipeline and rebuild the results in input order.
    ///
    /// The collection has `first_index + items.len()` slots; slots below
    /// `first_index` and slots never filled (after cancellation) hold `U::default()`.
    pub fn execute<T, U, I, F>(self, items: I, transform: F) -> Result<PipelineReport<U>>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator + Send,
        T: Send,
        U: Default + Send,
        F: Fn(T) -> U + Sync,
    {
        let items = items.into_iter();
        let len = self.first_index + items.len();

        let (sequenced, stats) =
            self.run_with(items, transform, |stream| Sequencer::new(len).drain(stream))?;
        let results = sequenced
            .context("Failed to reassemble pipeline results")?
            .finish(stats.cancelled);

        Ok(PipelineReport { results, stats })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::with_workers(DEFAULT_WORKERS)
    }
}

/// Process `item_count` values (the indices `1..=item_count`) with
/// `worker_count` workers and return them in index order.
///
/// Slot 0 is never filled and keeps `U::default()`.
pub fn run<U, F>(item_count: usize, transform: F, worker_count: usize) -> Result<OrderedResults<U>>
where
    U: Default + Send,
    F: Fn(u64) -> U + Sync,
{
    let pipeline = Pipeline::with_workers(worker_count);
    let first_index = pipeline.first_index;
    let items = (first_index..first_index + item_count).map(|index| index as u64);

    Ok(pipeline.execute(items, transform)?.results)
}

/// Calculate workers from available cores and configuration limits
///
/// ```text
/// 1. Detect available CPU cores: num_cpus::get()
/// 2. Apply percentage: cores * thread_percentage / 100
/// 3. Apply config limit: min(max_threads, percentage_result) if max_threads > 0
/// 4. Ensure minimum: max(1, final_result)
/// ```
pub fn calculate_optimal_workers(max_threads: usize, thread_percentage: u8) -> usize {
    let available_cores = num_cpus::get();

    let workers_by_percentage =
        std::cmp::max(1, (available_cores * thread_percentage as usize) / 100);

    if max_threads > 0 {
        std::cmp::min(max_threads, workers_by_percentage)
    } else {
        workers_by_percentage
    }
}
