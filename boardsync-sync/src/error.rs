//! Error types for boardsync-sync.

use thiserror::Error;

use boardsync_board::BoardError;
use boardsync_core::ConfigError;

/// Errors that abort processing of a board pair (or, for
/// [`SyncError::NoBoardsProcessed`], the whole run).
///
/// Item-level failures never become a `SyncError`; they are recorded as
/// [`crate::summary::SkipReason`] and [`crate::summary::StepFailure`] values.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A board-service call needed for the whole pair failed.
    #[error("board error: {0}")]
    Board(#[from] BoardError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A list the rules depend on does not exist on the source board.
    #[error("list '{list}' not found on board {board}")]
    ListNotFound { list: String, board: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Every configured pair failed in every phase.
    #[error("no board pair could be processed")]
    NoBoardsProcessed,
}
