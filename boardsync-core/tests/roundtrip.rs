//! Serde roundtrip tests for `boardsync-core` types.

use std::collections::BTreeSet;

use boardsync_core::types::{
    Attachment, Card, CardId, CheckItem, CheckItemId, Checklist, ChecklistId, Comment, LabelId,
    ListId, MemberId, ProvenanceRecord,
};
use chrono::{TimeZone, Utc};
use rstest::rstest;

fn bare_card() -> Card {
    Card {
        id: CardId::from("c-1"),
        title: "Grant A".into(),
        description: String::new(),
        due: None,
        list_id: ListId::from("l-1"),
        closed: false,
        label_ids: BTreeSet::new(),
        member_ids: BTreeSet::new(),
        attachments: vec![],
        checklists: vec![],
        comments: vec![],
    }
}

fn full_card() -> Card {
    let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    Card {
        id: CardId::from("c-2"),
        title: "Paper B — draft".into(),
        description: "multi\nline\ndescription".into(),
        due: Some(at),
        list_id: ListId::from("l-2"),
        closed: false,
        label_ids: [LabelId::from("lab-1")].into_iter().collect(),
        member_ids: [MemberId::from("m-1"), MemberId::from("m-2")]
            .into_iter()
            .collect(),
        attachments: vec![Attachment {
            name: Some("brief".into()),
            url: Some("https://example.org/brief.pdf".into()),
        }],
        checklists: vec![Checklist {
            id: ChecklistId::from("cl-1"),
            name: "In-Progress".into(),
            items: vec![CheckItem {
                id: CheckItemId::from("i-1"),
                name: "Outline".into(),
                done: true,
            }],
        }],
        comments: vec![Comment {
            author: "alice".into(),
            text: "looks good".into(),
            created_at: at,
        }],
    }
}

#[rstest]
#[case::bare(bare_card())]
#[case::full(full_card())]
fn card_json_roundtrip(#[case] card: Card) {
    let json = serde_json::to_string(&card).expect("serialize");
    let back: Card = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, card);
}

#[test]
fn card_defaults_fill_missing_collections() {
    let json = r#"{"id":"c-9","title":"t","due":null,"list_id":"l-9"}"#;
    let card: Card = serde_json::from_str(json).expect("deserialize");
    assert!(card.description.is_empty());
    assert!(card.checklists.is_empty());
    assert!(!card.closed);
}

#[test]
fn provenance_accepts_external_payload() {
    let json = r#"{
        "sourceContainerId": "list-7",
        "sourceCardId": "card-7",
        "originalDescription": "orig",
        "mirroredAt": "2025-01-02T03:04:05Z"
    }"#;
    let record: ProvenanceRecord = serde_json::from_str(json).expect("deserialize");
    assert_eq!(record.source_card_id, CardId::from("card-7"));
    assert_eq!(record.source_container_id, ListId::from("list-7"));
}
