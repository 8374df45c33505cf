//! hookwire CLI
//!
//! # Commands
//! - `hookwire inspect [input]` - decode the envelope stored in a message
//! - `hookwire simulate` - drive the demo counter flow through a console collaborator
//! - `hookwire config` - print the effective runtime configuration

mod console;
mod inspect;
mod simulate;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hookwire_observe::LogFormat;
use hookwire_runtime::RuntimeConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hookwire")]
#[command(author, version, about = "Tools for hookwire flows and their message metadata")]
struct Cli {
    /// TOML configuration file (HOOKWIRE_* variables still override it)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log output format (pretty, json)
    #[arg(long, global = true, default_value = "pretty")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode the envelope stored in message metadata
    Inspect {
        /// File path or inline JSON (default: stdin)
        input: Option<String>,
    },

    /// Run the demo counter flow against a console collaborator
    Simulate {
        /// Number of button clicks to replay
        #[arg(long, default_value_t = 3)]
        clicks: u32,

        /// Increment passed to the flow as a prop
        #[arg(long, default_value_t = 1)]
        step: i64,

        /// Print only the final message text
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn load_config(path: Option<&PathBuf>) -> Result<RuntimeConfig> {
    let config = match path {
        Some(path) => RuntimeConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => RuntimeConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    hookwire_observe::init_tracing(cli.log_format, &config.log_filter)?;

    match cli.command {
        Commands::Inspect { input } => inspect::run_inspect_command(&config, input.as_deref()),
        Commands::Simulate {
            clicks,
            step,
            quiet,
        } => {
            let text = simulate::run_simulate_command(&config, clicks, step, quiet).await?;
            println!("{}", text);
            Ok(())
        }
        Commands::Config => {
            print!(
                "{}",
                toml::to_string_pretty(&config).context("Failed to render config")?
            );
            Ok(())
        }
    }
}
