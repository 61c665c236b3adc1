//! Wire shapes of the board service's JSON, converted into domain types at
//! the boundary.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use boardsync_core::types::{
    Attachment, BoardList, Card, CardId, CheckItem, CheckItemId, Checklist, ChecklistId, Comment,
    Label, LabelId, ListId, MemberId,
};

use crate::error::BoardError;

const STATE_COMPLETE: &str = "complete";
const ACTION_COMMENT: &str = "commentCard";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireList {
    id: String,
    name: String,
    #[serde(default)]
    closed: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireLabel {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireAttachment {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireCheckItem {
    id: String,
    name: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    pos: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireChecklist {
    id: String,
    name: String,
    #[serde(default)]
    check_items: Vec<WireCheckItem>,
}

#[derive(Debug, Default, Deserialize)]
struct WireActionData {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMemberCreator {
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireAction {
    #[serde(rename = "type")]
    kind: String,
    date: DateTime<Utc>,
    #[serde(default)]
    data: WireActionData,
    #[serde(default)]
    id_member_creator: Option<String>,
    #[serde(default)]
    member_creator: Option<WireMemberCreator>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireCard {
    id: String,
    name: String,
    #[serde(default)]
    desc: String,
    #[serde(default)]
    due: Option<DateTime<Utc>>,
    id_list: String,
    #[serde(default)]
    closed: bool,
    #[serde(default)]
    id_labels: Vec<String>,
    #[serde(default)]
    id_members: Vec<String>,
    #[serde(default)]
    attachments: Vec<WireAttachment>,
    #[serde(default)]
    checklists: Vec<WireChecklist>,
    #[serde(default)]
    actions: Vec<WireAction>,
}

impl From<WireList> for BoardList {
    fn from(w: WireList) -> Self {
        BoardList {
            id: ListId(w.id),
            name: w.name,
            closed: w.closed,
        }
    }
}

impl From<WireLabel> for Label {
    fn from(w: WireLabel) -> Self {
        Label {
            id: LabelId(w.id),
            name: w.name.unwrap_or_default(),
        }
    }
}

impl From<WireCheckItem> for CheckItem {
    fn from(w: WireCheckItem) -> Self {
        CheckItem {
            id: CheckItemId(w.id),
            name: w.name,
            done: w.state == STATE_COMPLETE,
        }
    }
}

impl From<WireChecklist> for Checklist {
    fn from(w: WireChecklist) -> Self {
        let mut items = w.check_items;
        items.sort_by(|a, b| a.pos.total_cmp(&b.pos));
        Checklist {
            id: ChecklistId(w.id),
            name: w.name,
            items: items.into_iter().map(CheckItem::from).collect(),
        }
    }
}

impl WireAction {
    fn into_comment(self) -> Option<Comment> {
        if self.kind != ACTION_COMMENT {
            return None;
        }
        let author = self
            .member_creator
            .and_then(|m| m.username)
            .or(self.id_member_creator)
            .unwrap_or_default();
        Some(Comment {
            author,
            text: self.data.text?,
            created_at: self.date,
        })
    }
}

impl WireCard {
    /// Validate required fields and convert. `op` is used for error context.
    pub(crate) fn into_card(self, op: &str) -> Result<Card, BoardError> {
        if self.id.trim().is_empty() || self.id_list.trim().is_empty() {
            return Err(BoardError::Decode {
                op: op.to_string(),
                detail: "card is missing id or idList".to_string(),
            });
        }

        let mut comments: Vec<Comment> = self
            .actions
            .into_iter()
            .filter_map(WireAction::into_comment)
            .collect();
        // The service returns actions newest first.
        comments.sort_by_key(|c| c.created_at);

        Ok(Card {
            id: CardId(self.id),
            title: self.name,
            description: self.desc,
            due: self.due,
            list_id: ListId(self.id_list),
            closed: self.closed,
            label_ids: self.id_labels.into_iter().map(LabelId).collect(),
            member_ids: self.id_members.into_iter().map(MemberId).collect(),
            attachments: self
                .attachments
                .into_iter()
                .map(|a| Attachment {
                    name: a.name,
                    url: a.url,
                })
                .collect(),
            checklists: self.checklists.into_iter().map(Checklist::from).collect(),
            comments,
        })
    }
}
