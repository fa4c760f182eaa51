//! Reckon CLI - canonical spending ledger from bank and shared-expense exports
//!
//! Usage:
//!   reckon reconcile --config reckon.toml    Build the ledger
//!   reckon classify --config reckon.toml     Debug the category rule table

mod cli;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    // Logs go to stderr so a ledger written to stdout stays clean.
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Reconcile { output, summary } => {
            commands::cmd_reconcile(&cli.config, output.as_deref(), summary.as_deref())
        }
        Commands::Classify => commands::cmd_classify(&cli.config),
    }
}
