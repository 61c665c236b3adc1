//! Domain types for boards, cards and their sub-entities.
//!
//! Every id is an opaque string assigned by the board service and wrapped in a
//! newtype so card, list and checklist ids cannot be mixed up. All types are
//! serializable via serde; ids serialize as bare strings.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

id_newtype!(
    /// Identifier of a board.
    BoardId
);
id_newtype!(
    /// Identifier of a list (the "container" a card currently sits in).
    ListId
);
id_newtype!(
    /// Identifier of a card. Stable for the card's whole life.
    CardId
);
id_newtype!(
    /// Identifier of a board label.
    LabelId
);
id_newtype!(
    /// Identifier of a board member.
    MemberId
);
id_newtype!(ChecklistId);
id_newtype!(CheckItemId);

/// Label id → label name, resolved per board.
pub type LabelNames = HashMap<LabelId, String>;

// ---------------------------------------------------------------------------
// Board structure
// ---------------------------------------------------------------------------

/// A list on a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardList {
    pub id: ListId,
    pub name: String,
    #[serde(default)]
    pub closed: bool,
}

/// A label defined on a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

/// A link attached to a card. Uploads without a URL carry `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub url: Option<String>,
}

impl Attachment {
    /// The URL, if present and non-blank.
    pub fn usable_url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

/// One item of a checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckItem {
    pub id: CheckItemId,
    pub name: String,
    pub done: bool,
}

/// A named checklist. Checklists are matched across boards by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checklist {
    pub id: ChecklistId,
    pub name: String,
    #[serde(default)]
    pub items: Vec<CheckItem>,
}

impl Checklist {
    /// `done / total`, or `0.0` for an empty checklist.
    pub fn completion_ratio(&self) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }
        let done = self.items.iter().filter(|i| i.done).count();
        done as f64 / self.items.len() as f64
    }

    pub fn item_named(&self, name: &str) -> Option<&CheckItem> {
        self.items.iter().find(|i| i.name == name)
    }
}

/// A comment on a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Username (or id) of whoever wrote the comment.
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A card as read from the board service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub due: Option<DateTime<Utc>>,
    pub list_id: ListId,
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub label_ids: BTreeSet<LabelId>,
    #[serde(default)]
    pub member_ids: BTreeSet<MemberId>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub checklists: Vec<Checklist>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Card {
    pub fn checklist_named(&self, name: &str) -> Option<&Checklist> {
        self.checklists.iter().find(|c| c.name == name)
    }

    /// Set of usable attachment URLs.
    pub fn attachment_urls(&self) -> BTreeSet<&str> {
        self.attachments
            .iter()
            .filter_map(Attachment::usable_url)
            .collect()
    }
}

/// Where a newly created card lands in its list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    Top,
    #[default]
    Bottom,
}

impl Position {
    pub fn as_str(self) -> &'static str {
        match self {
            Position::Top => "top",
            Position::Bottom => "bottom",
        }
    }
}

/// Fields for creating a card.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCard {
    pub list_id: ListId,
    pub title: String,
    pub description: String,
    pub due: Option<DateTime<Utc>>,
    pub position: Position,
}

/// Partial update of a card's scalar fields. `None` leaves a field untouched;
/// `due: Some(None)` clears the due date.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CardUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<Option<DateTime<Utc>>>,
}

impl CardUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.due.is_none()
    }
}

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// Metadata embedded in a replica's description linking it back to the card
/// it was mirrored from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceRecord {
    pub source_container_id: ListId,
    pub source_card_id: CardId,
    pub original_description: String,
    pub mirrored_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, done: bool) -> CheckItem {
        CheckItem {
            id: CheckItemId::from(format!("i-{name}")),
            name: name.to_string(),
            done,
        }
    }

    #[test]
    fn newtype_display() {
        assert_eq!(CardId::from("c-1").to_string(), "c-1");
        assert_eq!(ListId::from("l-1").as_str(), "l-1");
    }

    #[test]
    fn empty_checklist_ratio_is_zero() {
        let checklist = Checklist {
            id: ChecklistId::from("cl"),
            name: "In-Progress".into(),
            items: vec![],
        };
        assert_eq!(checklist.completion_ratio(), 0.0);
    }

    #[test]
    fn checklist_ratio_counts_done_items() {
        let checklist = Checklist {
            id: ChecklistId::from("cl"),
            name: "In-Progress".into(),
            items: vec![
                item("a", true),
                item("b", true),
                item("c", true),
                item("d", false),
            ],
        };
        assert_eq!(checklist.completion_ratio(), 0.75);
    }

    #[test]
    fn provenance_uses_camel_case_keys() {
        let record = ProvenanceRecord {
            source_container_id: ListId::from("list-1"),
            source_card_id: CardId::from("card-1"),
            original_description: "hello".into(),
            mirrored_at: Utc::now(),
        };
        let json = serde_json::to_string(&record).expect("serialize");
        assert!(json.contains("\"sourceContainerId\":\"list-1\""));
        assert!(json.contains("\"sourceCardId\":\"card-1\""));
        assert!(json.contains("\"originalDescription\""));
        assert!(json.contains("\"mirroredAt\""));
    }

    #[test]
    fn blank_attachment_urls_are_unusable() {
        let blank = Attachment {
            name: None,
            url: Some("   ".into()),
        };
        let missing = Attachment {
            name: Some("upload.pdf".into()),
            url: None,
        };
        assert!(blank.usable_url().is_none());
        assert!(missing.usable_url().is_none());
    }

    #[test]
    fn card_update_emptiness() {
        assert!(CardUpdate::default().is_empty());
        let clear_due = CardUpdate {
            due: Some(None),
            ..CardUpdate::default()
        };
        assert!(!clear_due.is_empty());
    }
}
