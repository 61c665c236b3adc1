//! # boardsync-board
//!
//! The board-service seam. [`BoardClient`] is the only way the sync engine
//! talks to a board; [`TrelloClient`] implements it over HTTP and
//! `MemoryBoard` (behind the `test-utils` feature) implements it in-process
//! for tests.
//!
//! Every call is a plain synchronous request/response. There is no caching:
//! reads always return the service's current state.

pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod trello;
mod wire;

use boardsync_core::types::{
    BoardId, BoardList, Card, CardId, CardUpdate, CheckItem, CheckItemId, Checklist, ChecklistId,
    Label, LabelId, ListId, MemberId, NewCard,
};

pub use error::BoardError;
#[cfg(any(test, feature = "test-utils"))]
pub use memory::{Call, MemoryBoard, Op};
pub use trello::TrelloClient;

/// Read and write operations against a board service.
pub trait BoardClient {
    /// Lists on a board, including closed ones.
    fn board_lists(&self, board: &BoardId) -> Result<Vec<BoardList>, BoardError>;

    fn board_labels(&self, board: &BoardId) -> Result<Vec<Label>, BoardError>;

    /// Open cards on a board, with checklists and attachments.
    fn board_cards(&self, board: &BoardId) -> Result<Vec<Card>, BoardError>;

    /// Cards in a list, with checklists and attachments.
    fn list_cards(&self, list: &ListId) -> Result<Vec<Card>, BoardError>;

    /// One card with checklists, attachments and comments.
    fn get_card(&self, card: &CardId) -> Result<Card, BoardError>;

    fn create_card(&self, card: &NewCard) -> Result<Card, BoardError>;

    fn update_card(&self, card: &CardId, update: &CardUpdate) -> Result<(), BoardError>;

    fn delete_card(&self, card: &CardId) -> Result<(), BoardError>;

    fn add_member(&self, card: &CardId, member: &MemberId) -> Result<(), BoardError>;

    fn remove_member(&self, card: &CardId, member: &MemberId) -> Result<(), BoardError>;

    fn add_label(&self, card: &CardId, label: &LabelId) -> Result<(), BoardError>;

    fn add_attachment(&self, card: &CardId, url: &str) -> Result<(), BoardError>;

    fn create_checklist(&self, card: &CardId, name: &str) -> Result<Checklist, BoardError>;

    fn add_checklist_item(
        &self,
        checklist: &ChecklistId,
        name: &str,
        done: bool,
    ) -> Result<CheckItem, BoardError>;

    fn set_item_state(
        &self,
        card: &CardId,
        item: &CheckItemId,
        done: bool,
    ) -> Result<(), BoardError>;

    fn add_comment(&self, card: &CardId, text: &str) -> Result<(), BoardError>;
}
