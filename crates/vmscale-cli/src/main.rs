//! vmscale — autoscaling experiments on a simulated VM fleet.
//!
//! # Usage
//!
//! ```text
//! vmscale run --mode predictive --table data/predictions.csv
//! vmscale run --mode reactive --config vmscale.toml --format json
//! vmscale lookup --table data/predictions.csv --unit 1 --slot 0
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "vmscale",
    about = "Threshold autoscaling driven by forecast or live CPU utilization",
    version,
    propagate_version = true
)]
struct Cli {
    /// Emit diagnostic logs as JSON lines on stderr.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one autoscaling experiment and write its decision log.
    Run(commands::run::RunArgs),
    /// Print a single forecast from a table.
    Lookup {
        /// Forecast CSV file.
        #[arg(short, long)]
        table: PathBuf,
        /// Unit id to look up.
        #[arg(short, long)]
        unit: i64,
        /// Time slot to look up.
        #[arg(short, long)]
        slot: u64,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Print the effective configuration as TOML.
    Config {
        /// Configuration file to start from (defaults otherwise).
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vmscale_control=debug"));
    let logs = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        logs.json().init();
    } else {
        logs.init();
    }

    match cli.command {
        Commands::Run(args) => commands::run::run(args).await,
        Commands::Lookup {
            table,
            unit,
            slot,
            format,
        } => commands::lookup::lookup(&table, unit, slot, &format),
        Commands::Config { config } => commands::run::print_config(config.as_deref()),
    }
}
