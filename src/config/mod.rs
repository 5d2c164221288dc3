//! Configuration management for indexflow
//!
//! Settings are layered with figment: embedded defaults, user config, repo
//! config, `INDEXFLOW_` environment variables and finally CLI overrides.
//! The merged `[pipeline]` section is extracted into [`PipelineConfig`].

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

use crate::parallel::core::{
    DEFAULT_FIRST_INDEX, DEFAULT_THREAD_PERCENTAGE, DEFAULT_WORKERS, calculate_optimal_workers,
};

pub mod core;


pub use self::core::IndexflowConfig;

/// Pipeline settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Total number of work items emitted by the source
    pub item_count: usize,

    /// Number of parallel workers (0 = auto)
    pub worker_count: usize,

    /// Percentage of CPU cores used when `worker_count` is 0
    pub thread_percentage: u8,

    /// Index assigned to the first work item
    pub first_index: usize,

    /// Built-in transform applied by the CLI
    pub transform: TransformKind,
}

/// Built-in pure transforms selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    #[default]
    Square,
    Cube,
    Double,
    Identity,
}

impl TransformKind {
    /// Saturates instead of overflowing so the transform stays infallible
    pub fn apply(self, value: u64) -> u64 {
        match self {
            TransformKind::Square => value.saturating_mul(value),
            TransformKind::Cube => value.saturating_mul(value).saturating_mul(value),
            TransformKind::Double => value.saturating_mul(2),
            TransformKind::Identity => value,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            item_count: 99,
            worker_count: DEFAULT_WORKERS,
            thread_percentage: DEFAULT_THREAD_PERCENTAGE,
            first_index: DEFAULT_FIRST_INDEX,
            transform: TransformKind::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (1..=100).contains(&self.thread_percentage),
            "thread_percentage must be between 1 and 100, got {}",
            self.thread_percentage
        );
        ensure!(
            self.first_index.checked_add(self.item_count).is_some(),
            "first_index + item_count overflows"
        );
        Ok(())
    }

    /// Worker count after resolving 0 to the core-based default
    pub fn effective_workers(&self) -> usize {
        if self.worker_count == 0 {
            calculate_optimal_workers(0, self.thread_percentage)
        } else {
            self.worker_count
        }
    }

    /// Input values for a canonical run: each value equals its index
    pub fn items(&self) -> impl ExactSizeIterator<Item = u64> + Send + use<> {
        (self.first_index..self.first_index + self.item_count).map(|index| index as u64)
    }
}
