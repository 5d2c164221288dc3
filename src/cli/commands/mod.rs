use anyhow::Result;
use clap::{Parser, Subcommand};

use super::output::Output;

pub mod config;
pub mod run;
pub mod version;

#[derive(Parser)]
#[command(
    name = "indexflow",
    version = env!("CARGO_PKG_VERSION"),
    about = "Bounded fan-out/fan-in pipeline that restores input order",
    long_about = "indexflow emits indexed work items, transforms them on a fixed pool of \
                  worker threads, merges the unordered results and prints them back in \
                  their original order."
)]
pub struct Cli {
    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use custom configuration file
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the pipeline and print the ordered results
    Run(run::RunArgs),
    /// Configuration management
    Config(config::ConfigArgs),
    /// Show version information
    Version(version::VersionArgs),
}

impl Cli {
    pub fn run(self) -> Result<()> {
        // Set up logging based on verbosity
        setup_logging(self.verbose, self.quiet);

        let output = Output::new(self.verbose > 0, self.quiet);
        let custom_config = self.config.as_deref();

        match self.command {
            Some(Commands::Run(args)) => run::execute(args, custom_config, &output),
            Some(Commands::Config(args)) => config::execute(args, custom_config, &output),
            Some(Commands::Version(args)) => version::execute(args),
            // Default behavior - a run with configured settings
            None => run::execute(run::RunArgs::default(), custom_config, &output),
        }
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info"),
            2 => tracing_subscriber::EnvFilter::new("debug"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_names(verbose >= 2)
        .with_target(false)
        .init();
}
