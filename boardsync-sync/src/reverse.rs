//! Reverse sync: master replica → source card.
//!
//! For each replica in a master list: recover provenance, re-read the live
//! source, compute a [`CardPatch`] and apply it. Propagation rules:
//!
//! | entity          | direction                                               |
//! |-----------------|---------------------------------------------------------|
//! | title, due      | replica value wins when different                       |
//! | description     | written back only if a human edited the replica         |
//! | checklist items | add missing, copy completion state; never delete        |
//! | checklists      | replica-only checklists are created on the source       |
//! | members         | full reconciliation (add and remove)                    |
//! | labels          | add-only                                                |
//! | attachments     | add-only, matched by URL                                |
//! | comments        | every non-system replica comment is appended            |
//!
//! A member the forward mirror failed to copy is listed in the replica's
//! system comment and is never removed from the source.
//!
//! Comments are not de-duplicated across runs: a human comment that stays on
//! a replica is appended to the source again on every run.

use std::collections::BTreeSet;

use serde::Serialize;

use boardsync_board::{BoardClient, BoardError};
use boardsync_core::{
    config::BoardPair,
    types::{Card, CardUpdate, CheckItemId, ChecklistId, LabelId, MemberId, ProvenanceRecord},
};

use crate::metadata;
use crate::mirror::{skip, uncopied_members, SYSTEM_COMMENT_MARKER};
use crate::summary::{ReversePair, SkipReason, Step, StepFailure, SyncedCard};

// ---------------------------------------------------------------------------
// Patch
// ---------------------------------------------------------------------------

/// A change to one checklist item on the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemChange {
    Add {
        checklist_id: ChecklistId,
        checklist: String,
        item: String,
        done: bool,
    },
    SetState {
        checklist: String,
        item_id: CheckItemId,
        item: String,
        done: bool,
    },
}

/// A checklist that exists only on the replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewChecklist {
    pub name: String,
    /// `(item name, done)` in replica order.
    pub items: Vec<(String, bool)>,
}

/// Everything reverse sync would write to one source card.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CardPatch {
    pub update: CardUpdate,
    pub new_checklists: Vec<NewChecklist>,
    pub item_changes: Vec<ItemChange>,
    pub members_to_add: Vec<MemberId>,
    pub members_to_remove: Vec<MemberId>,
    pub labels_to_add: Vec<LabelId>,
    pub attachments_to_add: Vec<String>,
    pub comments_to_append: Vec<String>,
}

impl CardPatch {
    /// Number of individual writes the patch would make.
    pub fn change_count(&self) -> usize {
        let update = &self.update;
        let fields = [
            update.title.is_some(),
            update.description.is_some(),
            update.due.is_some(),
        ]
        .into_iter()
        .filter(|changed| *changed)
        .count();
        fields
            + self.new_checklists.len()
            + self.item_changes.len()
            + self.members_to_add.len()
            + self.members_to_remove.len()
            + self.labels_to_add.len()
            + self.attachments_to_add.len()
            + self.comments_to_append.len()
    }

    pub fn is_empty(&self) -> bool {
        self.change_count() == 0
    }
}

/// Diff `replica` against the live `source`. Pure: performs no I/O.
pub fn compute_patch(replica: &Card, record: &ProvenanceRecord, source: &Card) -> CardPatch {
    let mut patch = CardPatch::default();

    if replica.title != source.title {
        patch.update.title = Some(replica.title.clone());
    }
    if replica.due != source.due {
        patch.update.due = Some(replica.due);
    }
    // Only a human edit on the replica is rescued; an untouched replica must
    // not revert a newer edit made on the source.
    let edited = metadata::strip_metadata(&replica.description);
    if edited != source.description && edited != record.original_description {
        patch.update.description = Some(edited);
    }

    for checklist in &replica.checklists {
        let Some(target) = source.checklist_named(&checklist.name) else {
            patch.new_checklists.push(NewChecklist {
                name: checklist.name.clone(),
                items: checklist
                    .items
                    .iter()
                    .map(|i| (i.name.clone(), i.done))
                    .collect(),
            });
            continue;
        };
        for item in &checklist.items {
            match target.item_named(&item.name) {
                None => patch.item_changes.push(ItemChange::Add {
                    checklist_id: target.id.clone(),
                    checklist: target.name.clone(),
                    item: item.name.clone(),
                    done: item.done,
                }),
                Some(existing) if existing.done != item.done => {
                    patch.item_changes.push(ItemChange::SetState {
                        checklist: target.name.clone(),
                        item_id: existing.id.clone(),
                        item: item.name.clone(),
                        done: item.done,
                    })
                }
                Some(_) => {}
            }
        }
    }

    patch.members_to_add = replica
        .member_ids
        .difference(&source.member_ids)
        .cloned()
        .collect();
    let uncopied: BTreeSet<MemberId> = replica
        .comments
        .iter()
        .flat_map(|c| uncopied_members(&c.text))
        .collect();
    patch.members_to_remove = source
        .member_ids
        .difference(&replica.member_ids)
        .filter(|m| !uncopied.contains(*m))
        .cloned()
        .collect();

    patch.labels_to_add = replica
        .label_ids
        .difference(&source.label_ids)
        .cloned()
        .collect();

    let source_urls = source.attachment_urls();
    let mut seen = BTreeSet::new();
    for url in replica.attachments.iter().filter_map(|a| a.usable_url()) {
        if !source_urls.contains(url) && seen.insert(url) {
            patch.attachments_to_add.push(url.to_string());
        }
    }

    patch.comments_to_append = replica
        .comments
        .iter()
        .filter(|c| !c.text.trim_start().starts_with(SYSTEM_COMMENT_MARKER))
        .map(|c| c.text.clone())
        .collect();

    patch
}

/// Write `patch` to `source`.
///
/// Every sub-step runs regardless of earlier failures. Returns the sub-step
/// failures, or [`SkipReason::FieldUpdateFailed`] when the scalar field
/// update itself failed.
pub fn apply_patch<C: BoardClient + ?Sized>(
    client: &C,
    source: &Card,
    patch: &CardPatch,
) -> Result<Vec<StepFailure>, SkipReason> {
    let field_result = if patch.update.is_empty() {
        Ok(())
    } else {
        client.update_card(&source.id, &patch.update)
    };

    let mut failures = Vec::new();
    let mut record = |step: Step, result: Result<(), BoardError>| {
        if let Err(err) = result {
            tracing::warn!("'{}': {step} write-back failed: {err}", source.title);
            failures.push(StepFailure::new(step, err));
        }
    };

    for change in &patch.item_changes {
        let result = match change {
            ItemChange::Add {
                checklist_id,
                item,
                done,
                ..
            } => client
                .add_checklist_item(checklist_id, item, *done)
                .map(|_| ()),
            ItemChange::SetState { item_id, done, .. } => {
                client.set_item_state(&source.id, item_id, *done)
            }
        };
        record(Step::Checklists, result);
    }

    for checklist in &patch.new_checklists {
        match client.create_checklist(&source.id, &checklist.name) {
            Ok(created) => {
                for (name, done) in &checklist.items {
                    record(
                        Step::Checklists,
                        client.add_checklist_item(&created.id, name, *done).map(|_| ()),
                    );
                }
            }
            Err(err) => record(Step::Checklists, Err(err)),
        }
    }

    for member in &patch.members_to_add {
        record(Step::Members, client.add_member(&source.id, member));
    }
    for member in &patch.members_to_remove {
        record(Step::Members, client.remove_member(&source.id, member));
    }

    for label in &patch.labels_to_add {
        record(Step::Labels, client.add_label(&source.id, label));
    }

    for url in &patch.attachments_to_add {
        record(Step::Attachments, client.add_attachment(&source.id, url));
    }

    for text in &patch.comments_to_append {
        record(Step::Comments, client.add_comment(&source.id, text));
    }

    match field_result {
        Ok(()) => Ok(failures),
        Err(err) => Err(SkipReason::FieldUpdateFailed {
            detail: err.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// A replica, its live source and the patch between them.
#[derive(Debug, Clone)]
pub struct PendingSync {
    pub replica: Card,
    pub record: ProvenanceRecord,
    pub source: Card,
    pub patch: CardPatch,
}

/// Recover provenance for `listed` (as returned by a list read), re-read the
/// replica and its source, and compute the patch.
pub fn plan_replica<C: BoardClient + ?Sized>(
    client: &C,
    listed: &Card,
) -> Result<PendingSync, SkipReason> {
    if metadata::decode(&listed.description).is_none() {
        return Err(SkipReason::NoProvenance);
    }

    let replica = client
        .get_card(&listed.id)
        .map_err(|e| SkipReason::ReplicaUnavailable {
            detail: e.to_string(),
        })?;
    let record = metadata::decode(&replica.description).ok_or(SkipReason::NoProvenance)?;

    let source = client
        .get_card(&record.source_card_id)
        .map_err(|e| SkipReason::SourceUnavailable {
            detail: e.to_string(),
        })?;

    let patch = compute_patch(&replica, &record, &source);
    Ok(PendingSync {
        replica,
        record,
        source,
        patch,
    })
}

/// Reverse-sync one listed replica. With `dry_run`, the patch is computed
/// and counted but not applied.
pub fn sync_replica<C: BoardClient + ?Sized>(
    client: &C,
    listed: &Card,
    dry_run: bool,
) -> Result<SyncedCard, SkipReason> {
    let pending = plan_replica(client, listed)?;
    let changes = pending.patch.change_count();

    let failures = if dry_run || pending.patch.is_empty() {
        if dry_run && changes > 0 {
            tracing::info!(
                "[dry-run] would push {changes} change(s) from '{}' to {}",
                pending.replica.title,
                pending.source.id
            );
        }
        Vec::new()
    } else {
        apply_patch(client, &pending.source, &pending.patch)?
    };

    Ok(SyncedCard {
        replica_id: pending.replica.id,
        source_id: pending.source.id,
        title: pending.replica.title,
        changes,
        failures,
    })
}

/// Reverse-sync every card in `pair`'s master list.
pub fn reverse_pair<C: BoardClient + ?Sized>(
    client: &C,
    pair: &BoardPair,
    dry_run: bool,
) -> ReversePair {
    let mut report = ReversePair::new(&pair.name);

    let listed = match client.list_cards(&pair.master_list) {
        Ok(cards) => cards,
        Err(err) => {
            tracing::error!("[{}] skipping reverse sync: {err}", pair.name);
            report.error = Some(err.to_string());
            return report;
        }
    };

    for card in &listed {
        report.examined += 1;
        match sync_replica(client, card, dry_run) {
            Ok(synced) => {
                tracing::debug!(
                    "[{}] '{}' synced ({} change(s))",
                    pair.name,
                    synced.title,
                    synced.changes
                );
                report.synced.push(synced);
            }
            Err(reason) => {
                tracing::warn!("[{}] skipping '{}': {reason}", pair.name, card.title);
                report.skipped.push(skip(&card.id, &card.title, reason));
            }
        }
    }

    tracing::info!(
        "[{}] reverse sync: {} examined, {} synced, {} skipped",
        pair.name,
        report.examined,
        report.synced.len(),
        report.skipped.len()
    );
    report
}
