use anyhow::{Context, Result};
use crossbeam::channel::{Receiver, Sender, bounded};
use crossbeam::select;
use crossbeam::thread::Scope;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::progress::RunCounters;
use super::signal::CancellationSignal;
use super::types::{ResultItem, WorkItem};

/// Fixed-size pool of workers competing for one shared input channel
///
/// Every worker owns a private zero-capacity output channel. The pool keeps an
/// outstanding-worker counter that each worker decrements on exit, whether it
/// returns normally or unwinds; zero means every output channel is closed.
#[derive(Debug)]
pub struct WorkerPool {
    workers: usize,
    outstanding: AtomicUsize,
}

/// Context for worker threads to avoid too many function parameters
struct WorkerContext<'a, T, U, F> {
    worker_id: usize,
    input: Receiver<WorkItem<T>>,
    output: Sender<ResultItem<U>>,
    transform: &'a F,
    signal: &'a CancellationSignal,
    counters: &'a RunCounters,
}

struct WorkerExit<'a> {
    worker_id: usize,
    outstanding: &'a AtomicUsize,
    signal: &'a CancellationSignal,
}

impl Drop for WorkerExit<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::error!(worker_id = self.worker_id, "worker panicked, cancelling pipeline");
            self.signal.cancel();
        }

        let remaining = self.outstanding.fetch_sub(1, Ordering::AcqRel) - 1;
        tracing::trace!(worker_id = self.worker_id, remaining, "worker exited");
        if remaining == 0 {
            tracing::debug!("all workers exited, worker streams closed");
        }
    }
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            workers,
            outstanding: AtomicUsize::new(0),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Number of workers that have been spawned and not yet exited
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Spawn the workers into `scope`, returning one output receiver per worker
    pub fn spawn<'env, T, U, F>(
        &'env self,
        scope: &Scope<'env>,
        input: Receiver<WorkItem<T>>,
        transform: &'env F,
        signal: &'env CancellationSignal,
        counters: &'env RunCounters,
    ) -> Result<Vec<Receiver<ResultItem<U>>>>
    where
        T: Send + 'env,
        U: Send + 'env,
        F: Fn(T) -> U + Sync,
    {
        let mut outputs = Vec::with_capacity(self.workers);

        for worker_id in 0..self.workers {
            let (output_tx, output_rx) = bounded(0);
            let ctx = WorkerContext {
                worker_id,
                input: input.clone(),
                output: output_tx,
                transform,
                signal,
                counters,
            };

            // Count the worker before it can possibly exit
            self.outstanding.fetch_add(1, Ordering::AcqRel);
            let spawned = scope
                .builder()
                .name(format!("indexflow-worker-{worker_id}"))
                .spawn(move |_| self.worker_thread(ctx));

            if let Err(e) = spawned {
                self.outstanding.fetch_sub(1, Ordering::AcqRel);
                signal.cancel();
                return Err(e).with_context(|| format!("Failed to spawn worker {worker_id}"));
            }

            outputs.push(output_rx);
        }

        tracing::debug!(workers = self.workers, "worker pool started");
        Ok(outputs)
    }

    fn worker_thread<T, U, F>(&self, ctx: WorkerContext<'_, T, U, F>)
    where
        F: Fn(T) -> U,
    {
        let _exit = WorkerExit {
            worker_id: ctx.worker_id,
            outstanding: &self.outstanding,
            signal: ctx.signal,
        };

        // Channels are owned by the context and close when it is dropped,
        // before the exit guard runs
        process_items(ctx);
    }
}

fn process_items<T, U, F>(ctx: WorkerContext<'_, T, U, F>)
where
    F: Fn(T) -> U,
{
    loop {
        if ctx.signal.is_cancelled() {
            break;
        }

        let item = select! {
            recv(ctx.input) -> msg => match msg {
                Ok(item) => item,
                Err(_) => break, // Input exhausted
            },
            recv(ctx.signal.done()) -> _ => break,
        };

        let index = item.index;
        let result = item.map(ctx.transform);

        select! {
            send(ctx.output, result) -> res => {
                if res.is_err() {
                    break; // Merger dropped
                }
            }
            recv(ctx.signal.done()) -> _ => break,
        }

        let processed = ctx.counters.record_processed(ctx.worker_id);
        tracing::trace!(worker_id = ctx.worker_id, index, processed, "processed item");
    }
}
