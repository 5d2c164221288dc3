//! Styled status output for the indexflow CLI
//!
//! Status lines go to stderr so that stdout carries only pipeline results.

use console::style;

use crate::parallel::RunStats;

/// Output handler for consistent CLI formatting
pub struct Output {
    verbose: bool,
    quiet: bool,
}

impl Output {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    pub fn success(&self, message: &str) {
        if !self.quiet {
            eprintln!("{} {}", style("✔").green(), message);
        }
    }

    pub fn warning(&self, message: &str) {
        if !self.quiet {
            eprintln!("{} {}", style("⚠").yellow(), message);
        }
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            eprintln!("{} {}", style("ℹ").blue(), message);
        }
    }

    /// Only shown in verbose mode
    pub fn verbose(&self, message: &str) {
        if self.verbose && !self.quiet {
            eprintln!("{} {}", style("ℹ").dim(), style(message).dim());
        }
    }

    pub fn table_row(&self, key: &str, value: &str) {
        if !self.quiet {
            eprintln!("  {:<20} {}", style(key).dim(), value);
        }
    }

    /// Print the per-run statistics (verbose only)
    pub fn run_summary(&self, stats: &RunStats) {
        if !self.verbose || self.quiet {
            return;
        }

        eprintln!("\n{}", style("Pipeline summary").bold().cyan());
        self.table_row("workers", &stats.workers.to_string());
        self.table_row("emitted", &stats.emitted.to_string());
        self.table_row("forwarded", &stats.forwarded.to_string());
        for (worker_id, processed) in stats.processed.iter().enumerate() {
            self.table_row(&format!("worker-{worker_id}"), &processed.to_string());
        }
        self.table_row("elapsed", &format!("{:.2?}", stats.elapsed));
    }
}
