use anyhow::{Result, bail};
use clap::{Args, Subcommand};

use crate::cli::output::Output;
use crate::config::IndexflowConfig;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Display current merged configuration
    Show {
        /// Output format: toml, json
        #[arg(short, long, default_value = "toml")]
        format: String,
    },
    /// Validate the merged configuration
    Validate,
}

pub fn execute(args: ConfigArgs, custom_config: Option<&str>, output: &Output) -> Result<()> {
    let config = IndexflowConfig::load_with_custom_config(custom_config)?;

    match args.command {
        ConfigCommand::Show { format } => {
            let pipeline = config.pipeline()?;
            output.verbose(&format!("Showing merged configuration as {format}"));

            match format.to_lowercase().as_str() {
                "toml" => {
                    let mut doc = toml::Table::new();
                    doc.insert("pipeline".to_string(), toml::Value::try_from(&pipeline)?);
                    print!("{}", toml::to_string_pretty(&doc)?);
                }
                "json" => {
                    let doc = serde_json::json!({ "pipeline": pipeline });
                    println!("{}", serde_json::to_string_pretty(&doc)?);
                }
                _ => bail!("Unsupported format: {}. Use toml or json", format),
            }
        }
        ConfigCommand::Validate => {
            let pipeline = config.pipeline()?;
            output.success(&format!(
                "Configuration is valid ({} items, {} workers)",
                pipeline.item_count,
                pipeline.effective_workers()
            ));
        }
    }

    Ok(())
}
