//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Reckon - reconcile bank and shared-expense records into one ledger
#[derive(Parser)]
#[command(name = "reckon")]
#[command(about = "Reconciles aggregator transactions with a shared-expense ledger", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Run configuration
    #[arg(short, long, default_value = "reckon.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the canonical ledger
    Reconcile {
        /// Ledger CSV path (overrides `[output] ledger`; stdout when neither is set)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a JSON run summary with step stats and the input fingerprint
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Show the category each aggregator transaction gets and which field decided it
    Classify,
}
