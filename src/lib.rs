//! # indexflow - ordered results from a bounded parallel pipeline
//!
//! indexflow distributes a stream of indexed work items across a fixed pool of
//! worker threads, merges the per-worker result streams into one unordered
//! stream, and rebuilds the original order from each item's index.
//!
//! ## Features
//!
//! - **Exactly-once processing**: workers compete for one shared rendezvous channel
//! - **Bounded parallelism**: a fixed worker count, no queueing beyond hand-off
//! - **Coordinated shutdown**: one write-once cancellation signal observed by every stage
//! - **Deterministic order**: results land in the slot named by their index
//! - **Layered configuration**: TOML/JSON/YAML files, `INDEXFLOW_` env vars, CLI flags
//!
//! ## Quick Start
//!
//! ```bash
//! # Square 1..=99 on 8 workers and print the 100 ordered slots
//! indexflow run
//!
//! # Cube 1000 items on 4 workers, cancel after 50ms
//! indexflow run --items 1000 --workers 4 --transform cube --delay 1 --cancel-after 50
//! ```
//!
//! ## Library Usage
//!
//! ```rust
//! use indexflow::parallel::Pipeline;
//!
//! let report = Pipeline::with_workers(4)
//!     .first_index(0)
//!     .execute(vec![3u64, 1, 2], |v| v * 10)?;
//!
//! assert_eq!(report.results.as_slice(), &[30, 10, 20]);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cli;
pub mod config;
pub mod parallel;

pub use cli::{Cli, Output};
pub use config::{IndexflowConfig, PipelineConfig};

/// Result type alias for indexflow operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
