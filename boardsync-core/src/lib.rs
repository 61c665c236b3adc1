//! boardsync core library: domain types, configuration, errors.
//!
//! - [`types`]: id newtypes, cards and their sub-entities, provenance
//! - [`config`]: [`SyncConfig`] loading from the environment
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{BoardPair, Credentials, PromotionRules, SyncConfig};
pub use error::ConfigError;
pub use types::{
    Attachment, BoardId, BoardList, Card, CardId, CardUpdate, CheckItem, CheckItemId, Checklist,
    ChecklistId, Comment, Label, LabelId, LabelNames, ListId, MemberId, NewCard, Position,
    ProvenanceRecord,
};
