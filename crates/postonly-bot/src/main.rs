//! Post-only signal execution bot - Entry Point
//!
//! `run` serves signals (live or `--paper`), `report` prints round trips
//! rebuilt from trade history.

use anyhow::Result;
use clap::{Parser, Subcommand};
use postonly_bot::report::parse_since;
use postonly_bot::{AppConfig, Application, ExchangeMode};
use postonly_core::Symbol;
use tracing::info;

/// Post-only execution bot for Binance USD-M futures
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via POSTONLY_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Use the in-process simulated exchange instead of Binance
    #[arg(long, global = true)]
    paper: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve webhook signals (default)
    Run,
    /// Print closed round trips from trade history
    Report {
        /// Symbol to report (defaults to webhook.default_symbol)
        #[arg(long)]
        symbol: Option<String>,
        /// Start time: RFC 3339 or YYYY-MM-DD
        #[arg(long)]
        since: Option<String>,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    postonly_telemetry::init_logging()?;

    info!("Starting postonly-bot v{}", env!("CARGO_PKG_VERSION"));

    let config_path = AppConfig::resolve_path(args.config);
    info!(config_path = %config_path, "Loading configuration");
    let config = AppConfig::load(&config_path)?;

    let mode = if args.paper {
        ExchangeMode::Paper
    } else {
        ExchangeMode::Live
    };

    match args.command.unwrap_or(Command::Run) {
        Command::Run => {
            let mut app = Application::new(config, mode)?;
            app.run_preflight().await?;
            app.run().await?;
        }
        Command::Report {
            symbol,
            since,
            json,
        } => {
            let symbol = Symbol::new(symbol.unwrap_or_else(|| config.webhook.default_symbol.clone()))?;
            let since = since.as_deref().map(parse_since).transpose()?;
            let app = Application::new(config, mode)?;
            let report = app.report(&symbol, since, json).await?;
            println!("{report}");
        }
    }

    Ok(())
}
