//! Run orchestrator shared by every CLI entry point.
//!
//! Phases run strictly in order, each over every configured pair:
//!
//! 1. reverse sync (master → source)
//! 2. clear every master list
//! 3. forward mirror (source → master)
//!
//! A pair that fails in one phase is still attempted in the next. There is
//! no checkpointing: an interrupted run leaves an empty or partially rebuilt
//! master list, which the next run's clear phase repairs.

use serde::Serialize;

use boardsync_board::BoardClient;
use boardsync_core::config::{BoardPair, SyncConfig};

use crate::mirror::{mirror_pair, skip};
use crate::reverse::reverse_pair;
use crate::summary::{ClearPair, ForwardPair, ReversePair, SkipReason};
use crate::SyncError;

/// Outcome of a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub dry_run: bool,
    pub reverse: Vec<ReversePair>,
    pub cleared: Vec<ClearPair>,
    pub forward: Vec<ForwardPair>,
}

impl RunSummary {
    pub fn synced_count(&self) -> usize {
        self.reverse.iter().map(|p| p.synced.len()).sum()
    }

    pub fn reverse_skipped_count(&self) -> usize {
        self.reverse.iter().map(|p| p.skipped.len()).sum()
    }

    pub fn deleted_count(&self) -> usize {
        self.cleared.iter().map(|p| p.deleted).sum()
    }

    pub fn mirrored_count(&self) -> usize {
        self.forward.iter().map(|p| p.mirrored.len()).sum()
    }

    pub fn forward_skipped_count(&self) -> usize {
        self.forward.iter().map(|p| p.skipped.len()).sum()
    }

    pub fn step_failure_count(&self) -> usize {
        let reverse: usize = self
            .reverse
            .iter()
            .flat_map(|p| &p.synced)
            .map(|c| c.failures.len())
            .sum();
        let forward: usize = self
            .forward
            .iter()
            .flat_map(|p| &p.mirrored)
            .map(|c| c.failures.len())
            .sum();
        reverse + forward
    }

    /// Pairs that completed at least one phase without a pair-level error.
    pub fn pairs_processed(&self) -> usize {
        let names = self
            .reverse
            .iter()
            .filter(|p| p.error.is_none())
            .map(|p| &p.pair)
            .chain(self.cleared.iter().filter(|p| p.error.is_none()).map(|p| &p.pair))
            .chain(self.forward.iter().filter(|p| p.error.is_none()).map(|p| &p.pair));
        let mut unique: Vec<&String> = names.collect();
        unique.sort();
        unique.dedup();
        unique.len()
    }

    /// `Err` when no pair could be processed in any phase.
    pub fn ensure_processed(&self) -> Result<(), SyncError> {
        if self.pairs_processed() == 0 {
            return Err(SyncError::NoBoardsProcessed);
        }
        Ok(())
    }

    /// Emit the human-readable summary lines.
    pub fn log(&self) {
        let prefix = if self.dry_run { "[dry-run] " } else { "" };
        tracing::info!("{prefix}run summary:");
        tracing::info!(
            "{prefix}  reverse sync: {} synced, {} skipped",
            self.synced_count(),
            self.reverse_skipped_count()
        );
        tracing::info!("{prefix}  cleared: {} card(s)", self.deleted_count());
        tracing::info!(
            "{prefix}  forward mirror: {} mirrored, {} failed",
            self.mirrored_count(),
            self.forward_skipped_count()
        );
        tracing::info!("{prefix}  sub-step failures: {}", self.step_failure_count());
    }
}

/// Delete every card in `pair`'s master list.
pub fn clear_pair<C: BoardClient + ?Sized>(
    client: &C,
    pair: &BoardPair,
    dry_run: bool,
) -> ClearPair {
    let mut report = ClearPair {
        pair: pair.name.clone(),
        deleted: 0,
        failed: Vec::new(),
        error: None,
    };

    let cards = match client.list_cards(&pair.master_list) {
        Ok(cards) => cards,
        Err(err) => {
            tracing::error!("[{}] skipping clear: {err}", pair.name);
            report.error = Some(err.to_string());
            return report;
        }
    };

    for card in &cards {
        if dry_run {
            report.deleted += 1;
            continue;
        }
        match client.delete_card(&card.id) {
            Ok(()) => report.deleted += 1,
            Err(err) => {
                tracing::warn!("[{}] could not delete '{}': {err}", pair.name, card.title);
                report.failed.push(skip(
                    &card.id,
                    &card.title,
                    SkipReason::DeleteFailed {
                        detail: err.to_string(),
                    },
                ));
            }
        }
    }

    let verb = if dry_run { "would clear" } else { "cleared" };
    tracing::info!(
        "[{}] {verb} {} card(s) from master list {}",
        pair.name,
        report.deleted,
        pair.master_list
    );
    report
}

/// Execute one full run over every pair in `config`.
pub fn run<C: BoardClient + ?Sized>(client: &C, config: &SyncConfig) -> RunSummary {
    let dry_run = config.dry_run;
    if dry_run {
        tracing::info!("running in DRY-RUN mode - no changes will be made");
    }

    tracing::info!("phase 1/3: reverse sync");
    let reverse = config
        .pairs
        .iter()
        .map(|pair| reverse_pair(client, pair, dry_run))
        .collect();

    tracing::info!("phase 2/3: clearing master lists");
    let cleared = config
        .pairs
        .iter()
        .map(|pair| clear_pair(client, pair, dry_run))
        .collect();

    tracing::info!("phase 3/3: forward mirror");
    let forward = config
        .pairs
        .iter()
        .map(|pair| mirror_pair(client, pair, &config.rules, dry_run))
        .collect();

    let summary = RunSummary {
        dry_run,
        reverse,
        cleared,
        forward,
    };
    summary.log();
    summary
}
