//! In-process board service.
//!
//! [`MemoryBoard`] keeps boards, lists, labels and cards in memory, assigns
//! fresh ids on creation and records every call it receives. Failures can be
//! injected per operation (optionally only for calls whose target or argument
//! contains a given needle) to exercise the engine's fire-and-continue paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use boardsync_core::types::{
    Attachment, BoardId, BoardList, Card, CardId, CardUpdate, CheckItem, CheckItemId, Checklist,
    ChecklistId, Comment, Label, LabelId, ListId, MemberId, NewCard, Position,
};

use crate::error::BoardError;
use crate::BoardClient;

/// Author recorded on comments written through this board.
pub const MEMORY_AUTHOR: &str = "boardsync";

/// Kind of board call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    BoardLists,
    BoardLabels,
    BoardCards,
    ListCards,
    GetCard,
    CreateCard,
    UpdateCard,
    DeleteCard,
    AddMember,
    RemoveMember,
    AddLabel,
    AddAttachment,
    CreateChecklist,
    AddChecklistItem,
    SetItemState,
    AddComment,
}

impl Op {
    pub fn is_write(self) -> bool {
        !matches!(
            self,
            Op::BoardLists | Op::BoardLabels | Op::BoardCards | Op::ListCards | Op::GetCard
        )
    }
}

/// A recorded call: operation, target id, and the call's main argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: Op,
    pub target: String,
    pub arg: String,
}

#[derive(Debug, Default)]
struct BoardState {
    lists: Vec<BoardList>,
    labels: Vec<Label>,
}

#[derive(Debug, Default)]
struct State {
    boards: BTreeMap<BoardId, BoardState>,
    list_board: HashMap<ListId, BoardId>,
    cards: Vec<Card>,
    next_id: u64,
    calls: Vec<Call>,
    failures: Vec<(Op, String)>,
}

impl State {
    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn card_mut(&mut self, id: &CardId, op: &str) -> Result<&mut Card, BoardError> {
        self.cards
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| BoardError::NotFound { op: op.to_string() })
    }

    fn board_of_card(&self, card: &Card) -> Option<&BoardId> {
        self.list_board.get(&card.list_id)
    }
}

/// Thread-safe in-memory [`BoardClient`].
#[derive(Debug, Default)]
pub struct MemoryBoard {
    state: Mutex<State>,
}

impl MemoryBoard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- setup ---------------------------------------------------------------

    /// Register a board with `(list_id, list_name)` lists.
    pub fn add_board(&self, board: &str, lists: &[(&str, &str)]) {
        let mut state = self.lock();
        let board_id = BoardId::from(board);
        let entry = state.boards.entry(board_id.clone()).or_default();
        for (id, name) in lists {
            entry.lists.push(BoardList {
                id: ListId::from(*id),
                name: name.to_string(),
                closed: false,
            });
        }
        for (id, _) in lists {
            state.list_board.insert(ListId::from(*id), board_id.clone());
        }
    }

    pub fn define_label(&self, board: &str, id: &str, name: &str) {
        let mut state = self.lock();
        state
            .boards
            .entry(BoardId::from(board))
            .or_default()
            .labels
            .push(Label {
                id: LabelId::from(id),
                name: name.to_string(),
            });
    }

    /// Insert a fully formed card as-is.
    pub fn insert_card(&self, card: Card) {
        self.lock().cards.push(card);
    }

    /// Fail every `op` call whose target or argument contains `needle`
    /// (an empty needle matches every call).
    pub fn fail_when(&self, op: Op, needle: &str) {
        self.lock().failures.push((op, needle.to_string()));
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    // -- inspection ----------------------------------------------------------

    pub fn card(&self, id: &CardId) -> Option<Card> {
        self.lock().cards.iter().find(|c| &c.id == id).cloned()
    }

    pub fn cards_in(&self, list: &ListId) -> Vec<Card> {
        self.lock()
            .cards
            .iter()
            .filter(|c| &c.list_id == list)
            .cloned()
            .collect()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn count(&self, op: Op) -> usize {
        self.lock().calls.iter().filter(|c| c.op == op).count()
    }

    pub fn write_count(&self) -> usize {
        self.lock().calls.iter().filter(|c| c.op.is_write()).count()
    }

    pub fn reset_calls(&self) {
        self.lock().calls.clear();
    }

    // -- call bookkeeping ----------------------------------------------------

    /// Record a call and apply injected failures.
    fn begin(&self, op: Op, target: &str, arg: &str) -> Result<MutexGuard<'_, State>, BoardError> {
        let mut state = self.lock();
        state.calls.push(Call {
            op,
            target: target.to_string(),
            arg: arg.to_string(),
        });
        let injected = state
            .failures
            .iter()
            .any(|(f, needle)| *f == op && (target.contains(needle) || arg.contains(needle)));
        if injected {
            return Err(BoardError::Transport {
                op: format!("{op:?} {target}"),
                detail: "injected failure".to_string(),
            });
        }
        Ok(state)
    }
}

impl BoardClient for MemoryBoard {
    fn board_lists(&self, board: &BoardId) -> Result<Vec<BoardList>, BoardError> {
        let state = self.begin(Op::BoardLists, board.as_str(), "")?;
        state
            .boards
            .get(board)
            .map(|b| b.lists.clone())
            .ok_or_else(|| BoardError::NotFound {
                op: format!("GET boards/{board}/lists"),
            })
    }

    fn board_labels(&self, board: &BoardId) -> Result<Vec<Label>, BoardError> {
        let state = self.begin(Op::BoardLabels, board.as_str(), "")?;
        state
            .boards
            .get(board)
            .map(|b| b.labels.clone())
            .ok_or_else(|| BoardError::NotFound {
                op: format!("GET boards/{board}/labels"),
            })
    }

    fn board_cards(&self, board: &BoardId) -> Result<Vec<Card>, BoardError> {
        let state = self.begin(Op::BoardCards, board.as_str(), "")?;
        if !state.boards.contains_key(board) {
            return Err(BoardError::NotFound {
                op: format!("GET boards/{board}/cards/open"),
            });
        }
        Ok(state
            .cards
            .iter()
            .filter(|c| !c.closed && state.board_of_card(c) == Some(board))
            .map(|c| Card {
                comments: Vec::new(),
                ..c.clone()
            })
            .collect())
    }

    fn list_cards(&self, list: &ListId) -> Result<Vec<Card>, BoardError> {
        let state = self.begin(Op::ListCards, list.as_str(), "")?;
        Ok(state
            .cards
            .iter()
            .filter(|c| &c.list_id == list)
            .map(|c| Card {
                comments: Vec::new(),
                ..c.clone()
            })
            .collect())
    }

    fn get_card(&self, card: &CardId) -> Result<Card, BoardError> {
        let state = self.begin(Op::GetCard, card.as_str(), "")?;
        state
            .cards
            .iter()
            .find(|c| &c.id == card)
            .cloned()
            .ok_or_else(|| BoardError::NotFound {
                op: format!("GET cards/{card}"),
            })
    }

    fn create_card(&self, card: &NewCard) -> Result<Card, BoardError> {
        let mut state = self.begin(Op::CreateCard, card.list_id.as_str(), &card.title)?;
        if !state.list_board.contains_key(&card.list_id) {
            return Err(BoardError::NotFound {
                op: format!("POST cards (idList {})", card.list_id),
            });
        }
        let created = Card {
            id: CardId(state.fresh_id("card")),
            title: card.title.clone(),
            description: card.description.clone(),
            due: card.due,
            list_id: card.list_id.clone(),
            closed: false,
            label_ids: Default::default(),
            member_ids: Default::default(),
            attachments: Vec::new(),
            checklists: Vec::new(),
            comments: Vec::new(),
        };
        let at = match card.position {
            Position::Bottom => state.cards.len(),
            Position::Top => state
                .cards
                .iter()
                .position(|c| c.list_id == card.list_id)
                .unwrap_or(state.cards.len()),
        };
        state.cards.insert(at, created.clone());
        Ok(created)
    }

    fn update_card(&self, card: &CardId, update: &CardUpdate) -> Result<(), BoardError> {
        let mut state = self.begin(Op::UpdateCard, card.as_str(), "")?;
        let target = state.card_mut(card, "PUT cards")?;
        if let Some(title) = &update.title {
            target.title = title.clone();
        }
        if let Some(desc) = &update.description {
            target.description = desc.clone();
        }
        if let Some(due) = update.due {
            target.due = due;
        }
        Ok(())
    }

    fn delete_card(&self, card: &CardId) -> Result<(), BoardError> {
        let mut state = self.begin(Op::DeleteCard, card.as_str(), "")?;
        let before = state.cards.len();
        state.cards.retain(|c| &c.id != card);
        if state.cards.len() == before {
            return Err(BoardError::NotFound {
                op: format!("DELETE cards/{card}"),
            });
        }
        Ok(())
    }

    fn add_member(&self, card: &CardId, member: &MemberId) -> Result<(), BoardError> {
        let mut state = self.begin(Op::AddMember, card.as_str(), member.as_str())?;
        state
            .card_mut(card, "POST idMembers")?
            .member_ids
            .insert(member.clone());
        Ok(())
    }

    fn remove_member(&self, card: &CardId, member: &MemberId) -> Result<(), BoardError> {
        let mut state = self.begin(Op::RemoveMember, card.as_str(), member.as_str())?;
        state
            .card_mut(card, "DELETE idMembers")?
            .member_ids
            .remove(member);
        Ok(())
    }

    fn add_label(&self, card: &CardId, label: &LabelId) -> Result<(), BoardError> {
        let mut state = self.begin(Op::AddLabel, card.as_str(), label.as_str())?;
        state
            .card_mut(card, "POST idLabels")?
            .label_ids
            .insert(label.clone());
        Ok(())
    }

    fn add_attachment(&self, card: &CardId, url: &str) -> Result<(), BoardError> {
        let mut state = self.begin(Op::AddAttachment, card.as_str(), url)?;
        state
            .card_mut(card, "POST attachments")?
            .attachments
            .push(Attachment {
                name: None,
                url: Some(url.to_string()),
            });
        Ok(())
    }

    fn create_checklist(&self, card: &CardId, name: &str) -> Result<Checklist, BoardError> {
        let mut state = self.begin(Op::CreateChecklist, card.as_str(), name)?;
        let checklist = Checklist {
            id: ChecklistId(state.fresh_id("checklist")),
            name: name.to_string(),
            items: Vec::new(),
        };
        state
            .card_mut(card, "POST checklists")?
            .checklists
            .push(checklist.clone());
        Ok(checklist)
    }

    fn add_checklist_item(
        &self,
        checklist: &ChecklistId,
        name: &str,
        done: bool,
    ) -> Result<CheckItem, BoardError> {
        let mut state = self.begin(Op::AddChecklistItem, checklist.as_str(), name)?;
        let item = CheckItem {
            id: CheckItemId(state.fresh_id("item")),
            name: name.to_string(),
            done,
        };
        let target = state
            .cards
            .iter_mut()
            .flat_map(|c| c.checklists.iter_mut())
            .find(|cl| &cl.id == checklist)
            .ok_or_else(|| BoardError::NotFound {
                op: format!("POST checklists/{checklist}/checkItems"),
            })?;
        target.items.push(item.clone());
        Ok(item)
    }

    fn set_item_state(
        &self,
        card: &CardId,
        item: &CheckItemId,
        done: bool,
    ) -> Result<(), BoardError> {
        let mut state = self.begin(Op::SetItemState, card.as_str(), item.as_str())?;
        let target = state
            .card_mut(card, "PUT checkItem")?
            .checklists
            .iter_mut()
            .flat_map(|cl| cl.items.iter_mut())
            .find(|i| &i.id == item)
            .ok_or_else(|| BoardError::NotFound {
                op: format!("PUT cards/{card}/checkItem/{item}"),
            })?;
        target.done = done;
        Ok(())
    }

    fn add_comment(&self, card: &CardId, text: &str) -> Result<(), BoardError> {
        let mut state = self.begin(Op::AddComment, card.as_str(), text)?;
        state
            .card_mut(card, "POST actions/comments")?
            .comments
            .push(Comment {
                author: MEMORY_AUTHOR.to_string(),
                text: text.to_string(),
                created_at: Utc::now(),
            });
        Ok(())
    }
}
