//! Command-line interface for indexflow
//!
//! Parses arguments with clap and dispatches to the command implementations.

pub mod commands;
pub mod output;

pub use commands::Cli;
pub use output::Output;
