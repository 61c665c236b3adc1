//! `boardsync diff`: preview the edits reverse sync would push to sources.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use boardsync_board::TrelloClient;
use boardsync_sync::diff::{preview_pair, render};

use super::load_config;

/// Arguments for `boardsync diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Only preview the pair with this name.
    #[arg(long)]
    pub pair: Option<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let config = load_config(self.pair.as_deref())?;
        let client = TrelloClient::from_config(&config);

        let mut previews = Vec::new();
        let mut failed = 0;
        for pair in &config.pairs {
            match preview_pair(&client, pair) {
                Ok(preview) => previews.push(preview),
                Err(err) => {
                    failed += 1;
                    eprintln!("{} {}: {err}", "✗".red(), pair.name);
                }
            }
        }

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&previews).context("failed to serialize diff")?
            );
        } else {
            for preview in &previews {
                print!("{}", render(preview));
            }
            if previews.iter().all(|p| p.pending.is_empty()) && !previews.is_empty() {
                println!("No replica edits to push back.");
            }
        }

        if failed == config.pairs.len() {
            bail!("no master list could be read");
        }
        Ok(())
    }
}
