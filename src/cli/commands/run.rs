use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use crossbeam::channel::{Receiver, after, bounded};
use crossbeam::select;
use serde::Serialize;
use std::time::Duration;

use crate::cli::output::Output;
use crate::config::{IndexflowConfig, TransformKind};
use crate::parallel::{CancellationSignal, Pipeline};

/// Flags that override the `[pipeline]` configuration section
#[derive(Args, Debug, Default, Serialize)]
pub struct RunArgs {
    /// Number of work items to emit
    #[arg(short = 'n', long = "items")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_count: Option<usize>,

    /// Number of worker threads (0 = derive from CPU cores)
    #[arg(short, long = "workers")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_count: Option<usize>,

    /// Index assigned to the first work item
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_index: Option<usize>,

    /// Transform applied to each item
    #[arg(short, long, value_enum)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformKind>,

    /// Cancel the run after this many milliseconds
    #[arg(long, value_name = "MS")]
    #[serde(skip)]
    pub cancel_after: Option<u64>,

    /// Sleep this many milliseconds inside every transform
    #[arg(long, value_name = "MS")]
    #[serde(skip)]
    pub delay: Option<u64>,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    #[serde(skip)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One value per line, in index order
    #[default]
    Text,
    /// Results and run statistics as a JSON document
    Json,
}

pub fn execute(args: RunArgs, custom_config: Option<&str>, output: &Output) -> Result<()> {
    let config = IndexflowConfig::load_with_custom_config(custom_config)?
        .with_overrides(&args)
        .pipeline()?;

    let pipeline = Pipeline::new(&config);
    output.info(&format!(
        "Running {} items through {} workers ({:?})",
        config.item_count,
        pipeline.workers(),
        config.transform
    ));

    let (stop_timer, timer_stopped) = bounded::<()>(0);
    let timer = args
        .cancel_after
        .map(|ms| {
            spawn_cancel_timer(
                pipeline.cancellation(),
                timer_stopped,
                Duration::from_millis(ms),
            )
        })
        .transpose()?;

    let kind = config.transform;
    let delay = Duration::from_millis(args.delay.unwrap_or(0));
    let report = pipeline.execute(config.items(), move |value: u64| {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        kind.apply(value)
    });

    drop(stop_timer);
    if let Some(timer) = timer {
        timer
            .join()
            .map_err(|_| anyhow::anyhow!("Cancel timer thread panicked"))?;
    }
    let report = report?;

    match args.format {
        OutputFormat::Text => {
            for value in &report.results {
                println!("{value}");
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    let filled = report.results.filled_count();
    if report.results.cancelled() {
        output.warning(&format!(
            "Run cancelled: {} of {} items delivered",
            filled, config.item_count
        ));
    } else {
        output.verbose(&format!("Delivered {filled} items in order"));
    }
    output.run_summary(&report.stats);

    Ok(())
}

/// Fire `signal` after `timeout`, unless `stopped` disconnects first
fn spawn_cancel_timer(
    signal: CancellationSignal,
    stopped: Receiver<()>,
    timeout: Duration,
) -> Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name("indexflow-cancel-timer".to_string())
        .spawn(move || {
            select! {
                recv(stopped) -> _ => {}
                recv(after(timeout)) -> _ => {
                    if signal.cancel() {
                        tracing::warn!(timeout_ms = timeout.as_millis() as u64, "cancel timer fired");
                    }
                }
            }
        })
        .context("Failed to spawn cancel timer")
}
