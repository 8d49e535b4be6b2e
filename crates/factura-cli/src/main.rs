//! `factura`: invoices and sale prices from OCR block graphs.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{batch, config, extract, price};

/// Read supplier invoices from OCR block graph JSON and price their line items
#[derive(Parser)]
#[command(name = "factura", author, version, about, long_about = None)]
struct Cli {
    /// Log more: -v info, -vv debug, -vvv trace (RUST_LOG overrides)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON configuration file; built-in defaults when absent
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract an invoice from one block graph file
    Extract(extract::ExtractArgs),

    /// Extract every block graph file matching a glob
    Batch(batch::BatchArgs),

    /// Recommend sale prices for the line items of an extraction
    Price(price::PriceArgs),

    /// Show, create or edit the configuration file
    Config(config::ConfigArgs),
}

fn init_logging(verbose: u8) -> anyhow::Result<()> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {}", e))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Extract(args) => extract::run(args, config_path).await,
        Commands::Batch(args) => batch::run(args, config_path).await,
        Commands::Price(args) => price::run(args, config_path).await,
        Commands::Config(args) => config::run(args, config_path).await,
    }
}
