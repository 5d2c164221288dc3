//! Bounded fan-out / fan-in pipeline with order reassembly
//!
//! This module runs a stream of indexed work items through a fixed pool of
//! worker threads and hands back the results in their original order.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐      ┌──────────┐      ┌───────────┐      ┌───────────┐
//! │  Source  │─────▶│ Worker 0 │─────▶│ Forwarder │─────▶│           │
//! │ Emitter  │  │   └──────────┘      └───────────┘  │   │ Sequencer │
//! │          │  │   ┌──────────┐      ┌───────────┐  │   │ (consumer)│
//! │ index,   │  └──▶│ Worker K │─────▶│ Forwarder │──┘   │           │
//! │ value    │      └──────────┘      └───────────┘      └───────────┘
//! └──────────┘   shared input       per-worker streams   unordered merged
//!                (competing)                             stream
//! ```
//!
//! - **Source Emitter** ([`source`]): emits `WorkItem`s with contiguous indices, then closes.
//! - **Worker Pool** ([`worker`]): K workers compete for the single input channel;
//!   whichever is idle first claims the next item.
//! - **Fan-In Merger** ([`merge`]): one forwarder per worker stream, a
//!   `WaitGroup` tracker closes the merged stream after the last forwarder.
//! - **Sequencer** ([`sequencer`]): writes each result into the slot named by its index.
//! - **Cancellation** ([`signal`]): a write-once broadcast every stage selects against.
//!
//! Every channel is a zero-capacity crossbeam rendezvous channel: a send
//! blocks until a receiver takes the item, and each blocking send or receive
//! is raced against the cancellation signal.
//!
//! # Example Usage
//!
//! ```rust
//! use indexflow::parallel;
//!
//! // Square 1..=99 on 8 workers; slot 0 keeps its default
//! let results = parallel::run(99, |v| v * v, 8)?;
//! assert_eq!(results[0], 0);
//! assert_eq!(results[3], 9);
//! assert_eq!(results[99], 9801);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! Cancelling from another thread:
//!
//! ```rust
//! use indexflow::parallel::Pipeline;
//!
//! let pipeline = Pipeline::with_workers(4);
//! let signal = pipeline.cancellation();
//! signal.cancel();
//!
//! let report = pipeline.execute(0..10usize, |v| v * 2)?;
//! assert!(report.results.cancelled());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod core;
pub mod merge;
pub mod progress;
pub mod sequencer;
pub mod signal;
pub mod source;
pub mod types;
pub mod worker;

// Re-export main types for easier access
pub use self::core::{MergedStream, Pipeline, PipelineReport, run};
pub use progress::RunStats;
pub use sequencer::{OrderedResults, Sequencer};
pub use signal::CancellationSignal;
pub use types::{ResultItem, WorkItem};
pub use worker::WorkerPool;
