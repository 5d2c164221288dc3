use anyhow::Result;
use clap::Parser;

use indexflow::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.run()
}
