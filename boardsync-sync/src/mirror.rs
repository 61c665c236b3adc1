//! Forward mirror: source card → master replica.
//!
//! The replica is created at the bottom of the master list with the source's
//! title and due date and a description carrying provenance. Sub-entities are
//! then copied in order: members, labels, attachments, checklists, and a
//! final system comment. A failed call is logged and recorded; it never stops
//! the remaining calls, steps or cards. Only a failed card creation skips the
//! card.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use boardsync_board::BoardClient;
use boardsync_core::{
    config::{BoardPair, PromotionRules},
    types::{Card, CardId, ListId, MemberId, NewCard, Position},
};

use crate::eligibility::assess_board;
use crate::metadata;
use crate::summary::{CardSkip, ForwardPair, MirroredCard, SkipReason, Step, StepFailure};

/// Prefix of the comment written on every replica. Reverse sync never
/// copies comments starting with it back to the source.
pub const SYSTEM_COMMENT_MARKER: &str = "[Bot]";

const UNCOPIED_MEMBERS: &str = "Members not copied: ";

/// Text of the system comment recording where a replica came from.
///
/// Members whose copy failed are listed so reverse sync does not read their
/// absence on the replica as a removal.
pub fn system_comment(
    source: &Card,
    mirrored_at: DateTime<Utc>,
    uncopied: &[MemberId],
) -> String {
    let mut text = format!(
        "{SYSTEM_COMMENT_MARKER} Mirrored from source board (card {}, list {}) on {}.",
        source.id,
        source.list_id,
        mirrored_at.format("%Y-%m-%d %H:%M UTC"),
    );
    if !uncopied.is_empty() {
        let ids: Vec<&str> = uncopied.iter().map(MemberId::as_str).collect();
        text.push_str(&format!(" {UNCOPIED_MEMBERS}{}.", ids.join(", ")));
    }
    text
}

/// Member ids listed as not copied in a system comment. Empty for any other
/// comment.
pub(crate) fn uncopied_members(text: &str) -> BTreeSet<MemberId> {
    let text = text.trim();
    if !text.starts_with(SYSTEM_COMMENT_MARKER) {
        return BTreeSet::new();
    }
    let Some((_, list)) = text.split_once(UNCOPIED_MEMBERS) else {
        return BTreeSet::new();
    };
    list.trim_end_matches('.')
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(MemberId::from)
        .collect()
}

/// Replicate one source card into `target`.
pub fn mirror_card<C: BoardClient + ?Sized>(
    client: &C,
    source: &Card,
    target: &ListId,
) -> Result<MirroredCard, SkipReason> {
    let mirrored_at = Utc::now();
    let new_card = NewCard {
        list_id: target.clone(),
        title: source.title.clone(),
        description: metadata::encode_at(
            &source.list_id,
            &source.id,
            &source.description,
            mirrored_at,
        ),
        due: source.due,
        position: Position::Bottom,
    };

    let replica = client
        .create_card(&new_card)
        .map_err(|e| SkipReason::CreateFailed {
            detail: e.to_string(),
        })?;

    let mut failures = Vec::new();
    let mut record = |step: Step, result: Result<(), boardsync_board::BoardError>| {
        if let Err(err) = result {
            tracing::warn!("'{}': {step} step failed: {err}", source.title);
            failures.push(StepFailure::new(step, err));
        }
    };

    let mut uncopied = Vec::new();
    for member in &source.member_ids {
        let result = client.add_member(&replica.id, member);
        if result.is_err() {
            uncopied.push(member.clone());
        }
        record(Step::Members, result);
    }

    for label in &source.label_ids {
        record(Step::Labels, client.add_label(&replica.id, label));
    }

    for attachment in &source.attachments {
        match attachment.usable_url() {
            Some(url) => record(Step::Attachments, client.add_attachment(&replica.id, url)),
            None => tracing::debug!(
                "'{}': skipping attachment without URL ({:?})",
                source.title,
                attachment.name
            ),
        }
    }

    for checklist in &source.checklists {
        let created = match client.create_checklist(&replica.id, &checklist.name) {
            Ok(created) => created,
            Err(err) => {
                record(Step::Checklists, Err(err));
                continue;
            }
        };
        for item in &checklist.items {
            record(
                Step::Checklists,
                client
                    .add_checklist_item(&created.id, &item.name, item.done)
                    .map(|_| ()),
            );
        }
    }

    record(
        Step::Comments,
        client.add_comment(&replica.id, &system_comment(source, mirrored_at, &uncopied)),
    );

    tracing::info!("mirrored '{}' → {}", source.title, replica.id);
    Ok(MirroredCard {
        source_id: source.id.clone(),
        replica_id: Some(replica.id),
        title: source.title.clone(),
        failures,
    })
}

/// Mirror every eligible card of `pair`'s source board into its master list.
///
/// With `dry_run`, nothing is written; eligible cards are reported with no
/// replica id.
pub fn mirror_pair<C: BoardClient + ?Sized>(
    client: &C,
    pair: &BoardPair,
    rules: &PromotionRules,
    dry_run: bool,
) -> ForwardPair {
    let mut report = ForwardPair::new(&pair.name);

    let assessments = match assess_board(client, pair, rules) {
        Ok(a) => a,
        Err(err) => {
            tracing::error!("[{}] skipping forward mirror: {err}", pair.name);
            report.error = Some(err.to_string());
            return report;
        }
    };

    for assessment in assessments {
        report.evaluated += 1;
        if !assessment.decision.promote {
            continue;
        }
        let card = &assessment.card;

        if dry_run {
            tracing::info!("[dry-run] [{}] would mirror '{}'", pair.name, card.title);
            report.mirrored.push(MirroredCard {
                source_id: card.id.clone(),
                replica_id: None,
                title: card.title.clone(),
                failures: Vec::new(),
            });
            continue;
        }

        match mirror_card(client, card, &pair.master_list) {
            Ok(mirrored) => report.mirrored.push(mirrored),
            Err(reason) => {
                tracing::warn!("[{}] '{}' not mirrored: {reason}", pair.name, card.title);
                report.skipped.push(skip(&card.id, &card.title, reason));
            }
        }
    }

    tracing::info!(
        "[{}] forward mirror: {} evaluated, {} mirrored, {} failed",
        pair.name,
        report.evaluated,
        report.mirrored.len(),
        report.skipped.len()
    );
    report
}

pub(crate) fn skip(card_id: &CardId, title: &str, reason: SkipReason) -> CardSkip {
    CardSkip {
        card_id: card_id.clone(),
        title: title.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use boardsync_board::{MemoryBoard, Op};
    use boardsync_core::types::{
        Attachment, CheckItem, CheckItemId, Checklist, ChecklistId, LabelId,
    };

    use super::*;

    fn source_card() -> Card {
        Card {
            id: CardId::from("src-1"),
            title: "Grant A".into(),
            description: "Budget draft".into(),
            due: None,
            list_id: ListId::from("src-list"),
            closed: false,
            label_ids: [LabelId::from("lab-1")].into_iter().collect(),
            member_ids: [MemberId::from("m-1"), MemberId::from("m-2")]
                .into_iter()
                .collect(),
            attachments: vec![
                Attachment {
                    name: Some("good".into()),
                    url: Some("https://ok.example/a".into()),
                },
                Attachment {
                    name: Some("upload".into()),
                    url: None,
                },
                Attachment {
                    name: Some("bad".into()),
                    url: Some("https://bad.example/b".into()),
                },
            ],
            checklists: vec![Checklist {
                id: ChecklistId::from("cl-1"),
                name: "In-Progress".into(),
                items: vec![
                    CheckItem {
                        id: CheckItemId::from("i-1"),
                        name: "Outline".into(),
                        done: true,
                    },
                    CheckItem {
                        id: CheckItemId::from("i-2"),
                        name: "Submit".into(),
                        done: false,
                    },
                ],
            }],
            comments: vec![],
        }
    }

    fn master() -> MemoryBoard {
        let board = MemoryBoard::new();
        board.add_board("master", &[("master-list", "Proposals")]);
        board
    }

    #[test]
    fn replica_carries_everything() {
        let board = master();
        let source = source_card();
        let mirrored = mirror_card(&board, &source, &ListId::from("master-list")).expect("ok");
        assert!(mirrored.failures.is_empty());

        let replica = board.card(&mirrored.replica_id.expect("id")).expect("replica");
        assert_ne!(replica.id, source.id);
        assert_eq!(replica.title, "Grant A");
        assert_eq!(replica.member_ids, source.member_ids);
        assert_eq!(replica.label_ids, source.label_ids);
        assert_eq!(replica.attachments.len(), 2);
        assert_eq!(replica.checklists[0].items.len(), 2);
        assert!(replica.checklists[0].items[0].done);
        assert!(!replica.checklists[0].items[1].done);
        assert_eq!(replica.comments.len(), 1);
        assert!(replica.comments[0].text.starts_with(SYSTEM_COMMENT_MARKER));

        let record = metadata::decode(&replica.description).expect("provenance");
        assert_eq!(record.source_card_id, source.id);
        assert_eq!(record.source_container_id, source.list_id);
        assert_eq!(metadata::strip_metadata(&replica.description), "Budget draft");
    }

    #[test]
    fn failed_attachment_does_not_block_checklists() {
        let board = master();
        board.fail_when(Op::AddAttachment, "bad.example");
        let mirrored =
            mirror_card(&board, &source_card(), &ListId::from("master-list")).expect("ok");

        assert_eq!(mirrored.failures.len(), 1);
        assert_eq!(mirrored.failures[0].step, Step::Attachments);
        let replica = board.card(&mirrored.replica_id.expect("id")).expect("replica");
        assert_eq!(replica.checklists.len(), 1);
        assert_eq!(replica.comments.len(), 1);
    }

    #[test]
    fn failed_checklist_skips_only_its_items() {
        let board = master();
        board.fail_when(Op::CreateChecklist, "");
        let mirrored =
            mirror_card(&board, &source_card(), &ListId::from("master-list")).expect("ok");
        assert_eq!(mirrored.failures.len(), 1);
        assert_eq!(board.count(Op::AddChecklistItem), 0);
        assert_eq!(board.count(Op::AddComment), 1);
    }

    #[test]
    fn failed_creation_skips_card() {
        let board = master();
        board.fail_when(Op::CreateCard, "");
        let err = mirror_card(&board, &source_card(), &ListId::from("master-list")).unwrap_err();
        assert!(matches!(err, SkipReason::CreateFailed { .. }));
        assert_eq!(board.count(Op::AddMember), 0);
    }

    #[test]
    fn system_comment_names_source() {
        let text = system_comment(&source_card(), Utc::now(), &[]);
        assert!(text.starts_with("[Bot] "));
        assert!(text.contains("src-1"));
        assert!(uncopied_members(&text).is_empty());
    }

    #[test]
    fn failed_member_is_listed_in_system_comment() {
        let board = master();
        board.fail_when(Op::AddMember, "m-2");
        let mirrored =
            mirror_card(&board, &source_card(), &ListId::from("master-list")).expect("ok");

        assert_eq!(mirrored.failures.len(), 1);
        assert_eq!(mirrored.failures[0].step, Step::Members);
        let replica = board.card(&mirrored.replica_id.expect("id")).expect("replica");
        let uncopied: Vec<_> = uncopied_members(&replica.comments[0].text)
            .into_iter()
            .collect();
        assert_eq!(uncopied, [MemberId::from("m-2")]);
    }

    #[test]
    fn uncopied_members_reads_only_system_comments() {
        let listed = system_comment(
            &source_card(),
            Utc::now(),
            &[MemberId::from("m-1"), MemberId::from("m-2")],
        );
        assert_eq!(uncopied_members(&listed).len(), 2);
        assert!(uncopied_members("Members not copied: m-1.").is_empty());
    }

    #[test]
    fn blank_url_attachments_are_not_sent() {
        let board = master();
        let mut source = source_card();
        source.label_ids = BTreeSet::new();
        mirror_card(&board, &source, &ListId::from("master-list")).expect("ok");
        let urls: Vec<_> = board
            .calls()
            .into_iter()
            .filter(|c| c.op == Op::AddAttachment)
            .map(|c| c.arg)
            .collect();
        assert_eq!(urls, ["https://ok.example/a", "https://bad.example/b"]);
    }
}
