//! boardsync: mirror promoted cards into a master list and sync edits back.
//!
//! # Usage
//!
//! ```text
//! boardsync run [--dry-run] [--json]
//! boardsync check [--pair <name>] [--json]
//! boardsync diff [--pair <name>] [--json]
//! ```
//!
//! Configuration comes from the environment (and `./.env`); see
//! `boardsync_core::config` for the keys.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{check::CheckArgs, diff::DiffArgs, run::RunArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "boardsync",
    version,
    about = "Replicate promoted cards into master lists and sync edits back to their sources",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run reverse sync, clear every master list, then mirror eligible cards.
    Run(RunArgs),

    /// Show which source cards would be promoted, and why.
    Check(CheckArgs),

    /// Show what reverse sync would push back to source cards.
    Diff(DiffArgs),
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Check(args) => args.run(),
        Commands::Diff(args) => args.run(),
    }
}
