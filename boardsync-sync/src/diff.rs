//! Read-only preview of what reverse sync would push, for `boardsync diff`.

use std::fmt::Write as _;

use serde::Serialize;
use similar::TextDiff;

use boardsync_board::BoardClient;
use boardsync_core::{config::BoardPair, types::CardId};

use crate::reverse::{plan_replica, CardPatch, ItemChange};
use crate::summary::SkipReason;
use crate::SyncError;

/// Pending write-back for one replica.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardPreview {
    pub pair: String,
    pub replica_title: String,
    pub source_id: CardId,
    pub patch: CardPatch,
    /// Unified diff of the source description against the replica's
    /// human-edited description, when that would be written back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_diff: Option<String>,
}

/// A replica that could not be previewed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewSkip {
    pub title: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairPreview {
    pub pair: String,
    pub pending: Vec<CardPreview>,
    pub unchanged: usize,
    pub skipped: Vec<PreviewSkip>,
}

/// Compute the reverse-sync patch for every replica in `pair`'s master list
/// without writing anything.
pub fn preview_pair<C: BoardClient + ?Sized>(
    client: &C,
    pair: &BoardPair,
) -> Result<PairPreview, SyncError> {
    let listed = client.list_cards(&pair.master_list)?;
    let mut preview = PairPreview {
        pair: pair.name.clone(),
        pending: Vec::new(),
        unchanged: 0,
        skipped: Vec::new(),
    };

    for card in &listed {
        let pending = match plan_replica(client, card) {
            Ok(p) => p,
            Err(reason) => {
                preview.skipped.push(PreviewSkip {
                    title: card.title.clone(),
                    reason,
                });
                continue;
            }
        };
        if pending.patch.is_empty() {
            preview.unchanged += 1;
            continue;
        }
        let description_diff = pending
            .patch
            .update
            .description
            .as_deref()
            .map(|edited| description_diff(&pending.source.description, edited));
        preview.pending.push(CardPreview {
            pair: pair.name.clone(),
            replica_title: pending.replica.title,
            source_id: pending.source.id,
            patch: pending.patch,
            description_diff,
        });
    }
    Ok(preview)
}

fn description_diff(source: &str, edited: &str) -> String {
    let source = with_trailing_newline(source);
    let edited = with_trailing_newline(edited);
    TextDiff::from_lines(&source, &edited)
        .unified_diff()
        .header("source", "replica")
        .context_radius(3)
        .to_string()
}

fn with_trailing_newline(text: &str) -> String {
    if text.is_empty() || text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{text}\n")
    }
}

/// Plain-text rendering of a [`PairPreview`].
pub fn render(preview: &PairPreview) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "== {}: {} pending, {} unchanged, {} skipped",
        preview.pair,
        preview.pending.len(),
        preview.unchanged,
        preview.skipped.len()
    );

    for card in &preview.pending {
        let _ = writeln!(out, "\n'{}' → source {}", card.replica_title, card.source_id);
        render_patch(&mut out, &card.patch);
        if let Some(diff) = &card.description_diff {
            out.push_str(diff);
        }
    }

    for skip in &preview.skipped {
        let _ = writeln!(out, "\nskipped '{}': {}", skip.title, skip.reason);
    }
    out
}

fn render_patch(out: &mut String, patch: &CardPatch) {
    if let Some(title) = &patch.update.title {
        let _ = writeln!(out, "  title: {title}");
    }
    if let Some(due) = &patch.update.due {
        match due {
            Some(due) => {
                let _ = writeln!(out, "  due: {}", due.to_rfc3339());
            }
            None => out.push_str("  due: (cleared)\n"),
        }
    }
    if patch.update.description.is_some() {
        out.push_str("  description: edited\n");
    }
    for checklist in &patch.new_checklists {
        let _ = writeln!(
            out,
            "  + checklist '{}' ({} item(s))",
            checklist.name,
            checklist.items.len()
        );
    }
    for change in &patch.item_changes {
        match change {
            ItemChange::Add {
                checklist, item, done, ..
            } => {
                let _ = writeln!(out, "  + [{}] {checklist}: {item}", mark(*done));
            }
            ItemChange::SetState {
                checklist, item, done, ..
            } => {
                let _ = writeln!(out, "  ~ [{}] {checklist}: {item}", mark(*done));
            }
        }
    }
    for member in &patch.members_to_add {
        let _ = writeln!(out, "  + member {member}");
    }
    for member in &patch.members_to_remove {
        let _ = writeln!(out, "  - member {member}");
    }
    for label in &patch.labels_to_add {
        let _ = writeln!(out, "  + label {label}");
    }
    for url in &patch.attachments_to_add {
        let _ = writeln!(out, "  + attachment {url}");
    }
    for text in &patch.comments_to_append {
        let first = text.lines().next().unwrap_or_default();
        let _ = writeln!(out, "  + comment \"{first}\"");
    }
}

fn mark(done: bool) -> char {
    if done {
        'x'
    } else {
        ' '
    }
}
