//! `boardsync check`: eligibility report for every source card.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use boardsync_board::TrelloClient;
use boardsync_core::types::CardId;
use boardsync_sync::eligibility::{assess_board, DecisionReason};

use super::load_config;

/// Arguments for `boardsync check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Only check the pair with this name.
    #[arg(long)]
    pub pair: Option<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct PairCheck {
    pair: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    cards: Vec<CardCheck>,
}

#[derive(Debug, Serialize)]
struct CardCheck {
    card_id: CardId,
    title: String,
    list: Option<String>,
    promote: bool,
    reason: DecisionReason,
}

#[derive(Tabled)]
struct CheckRow {
    #[tabled(rename = "card")]
    title: String,
    #[tabled(rename = "list")]
    list: String,
    #[tabled(rename = "mirror")]
    promote: String,
    #[tabled(rename = "reason")]
    reason: String,
}

impl CheckArgs {
    pub fn run(self) -> Result<()> {
        let config = load_config(self.pair.as_deref())?;
        let client = TrelloClient::from_config(&config);

        let report: Vec<PairCheck> = config
            .pairs
            .iter()
            .map(|pair| match assess_board(&client, pair, &config.rules) {
                Ok(assessments) => PairCheck {
                    pair: pair.name.clone(),
                    error: None,
                    cards: assessments
                        .into_iter()
                        .map(|a| CardCheck {
                            card_id: a.card.id,
                            title: a.card.title,
                            list: a.list_name,
                            promote: a.decision.promote,
                            reason: a.decision.reason,
                        })
                        .collect(),
                },
                Err(err) => PairCheck {
                    pair: pair.name.clone(),
                    error: Some(err.to_string()),
                    cards: Vec::new(),
                },
            })
            .collect();

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize check report")?
            );
        } else {
            print_table(&report);
        }

        if report.iter().all(|p| p.error.is_some()) {
            bail!("no source board could be read");
        }
        Ok(())
    }
}

fn print_table(report: &[PairCheck]) {
    for pair in report {
        let promoted = pair.cards.iter().filter(|c| c.promote).count();
        println!(
            "{} ({} of {} card(s) eligible)",
            pair.pair.to_uppercase().bold(),
            promoted,
            pair.cards.len()
        );
        if let Some(error) = &pair.error {
            println!("  {}", error.red());
            continue;
        }
        if pair.cards.is_empty() {
            println!("  No open cards.");
            continue;
        }

        let rows: Vec<CheckRow> = pair
            .cards
            .iter()
            .map(|card| CheckRow {
                title: card.title.clone(),
                list: card.list.clone().unwrap_or_else(|| "?".to_string()),
                promote: if card.promote {
                    "yes".green().to_string()
                } else {
                    "no".bright_black().to_string()
                },
                reason: card.reason.to_string(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }
}
