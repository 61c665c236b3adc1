//! `boardsync run`: one full reverse-sync / clear / mirror cycle.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use boardsync_board::TrelloClient;
use boardsync_sync::{pipeline, RunSummary};

use super::load_config;

/// Arguments for `boardsync run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Compute and log every change without writing anything.
    /// Overrides `DRY_RUN` from the environment.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit the run summary as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let mut config = load_config(None)?;
        config.dry_run |= self.dry_run;

        let client = TrelloClient::from_config(&config);
        tracing::info!(
            "starting run over {} board pair(s) against {}",
            config.pairs.len(),
            config.api_base
        );
        let summary = pipeline::run(&client, &config);

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("failed to serialize run summary")?
            );
        } else {
            print_table(&summary);
        }

        summary.ensure_processed().context("run failed")?;
        Ok(())
    }
}

#[derive(Tabled)]
struct PairRow {
    #[tabled(rename = "pair")]
    pair: String,
    #[tabled(rename = "synced back")]
    synced: usize,
    #[tabled(rename = "skipped")]
    reverse_skipped: usize,
    #[tabled(rename = "cleared")]
    cleared: usize,
    #[tabled(rename = "mirrored")]
    mirrored: usize,
    #[tabled(rename = "failed")]
    forward_failed: usize,
    #[tabled(rename = "status")]
    status: String,
}

fn print_table(summary: &RunSummary) {
    let prefix = if summary.dry_run { "[dry-run] " } else { "" };
    let rows: Vec<PairRow> = summary
        .reverse
        .iter()
        .zip(&summary.cleared)
        .zip(&summary.forward)
        .map(|((reverse, cleared), forward)| {
            let errors: Vec<&str> = [&reverse.error, &cleared.error, &forward.error]
                .into_iter()
                .filter_map(|e| e.as_deref())
                .collect();
            let status = if errors.is_empty() {
                "ok".green().to_string()
            } else {
                errors.join("; ").red().to_string()
            };
            PairRow {
                pair: reverse.pair.clone(),
                synced: reverse.synced.len(),
                reverse_skipped: reverse.skipped.len(),
                cleared: cleared.deleted,
                mirrored: forward.mirrored.len(),
                forward_failed: forward.skipped.len(),
                status,
            }
        })
        .collect();

    println!("{}", format!("{prefix}boardsync run").bold());
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    let failures = summary.step_failure_count();
    if failures > 0 {
        println!(
            "{}",
            format!("{failures} sub-step failure(s); see log for details").yellow()
        );
    }
}
