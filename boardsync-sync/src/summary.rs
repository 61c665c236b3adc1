//! Per-item outcomes and per-phase summaries.
//!
//! Every card a phase touches ends up either as a success record or as a
//! [`CardSkip`]; sub-step failures on successful cards are kept as
//! [`StepFailure`]s. All of it serializes to JSON for `boardsync run --json`.

use std::fmt;

use serde::Serialize;

use boardsync_core::types::CardId;

/// A sub-step of mirroring or reverse-syncing a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Fields,
    Members,
    Labels,
    Attachments,
    Checklists,
    Comments,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Step::Fields => "fields",
            Step::Members => "members",
            Step::Labels => "labels",
            Step::Attachments => "attachments",
            Step::Checklists => "checklists",
            Step::Comments => "comments",
        };
        f.write_str(s)
    }
}

/// One failed call inside a sub-step. The remaining calls still ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub step: Step,
    pub detail: String,
}

impl StepFailure {
    pub fn new(step: Step, detail: impl fmt::Display) -> Self {
        Self {
            step,
            detail: detail.to_string(),
        }
    }
}

/// Why a card was left out of a phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The replica carries no (parseable) provenance record.
    NoProvenance,
    /// The replica could not be re-read.
    ReplicaUnavailable { detail: String },
    /// The source card could not be read (deleted, no permission, network).
    SourceUnavailable { detail: String },
    /// Writing the scalar field diff back to the source failed.
    FieldUpdateFailed { detail: String },
    /// Creating the replica failed.
    CreateFailed { detail: String },
    /// Deleting the card from the master list failed.
    DeleteFailed { detail: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoProvenance => f.write_str("no provenance record"),
            SkipReason::ReplicaUnavailable { detail } => write!(f, "replica unavailable: {detail}"),
            SkipReason::SourceUnavailable { detail } => write!(f, "source unavailable: {detail}"),
            SkipReason::FieldUpdateFailed { detail } => write!(f, "field update failed: {detail}"),
            SkipReason::CreateFailed { detail } => write!(f, "create failed: {detail}"),
            SkipReason::DeleteFailed { detail } => write!(f, "delete failed: {detail}"),
        }
    }
}

/// A card excluded from a phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardSkip {
    pub card_id: CardId,
    pub title: String,
    pub reason: SkipReason,
}

// ---------------------------------------------------------------------------
// Phase 1: reverse sync
// ---------------------------------------------------------------------------

/// A replica whose edits were pushed back to its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncedCard {
    pub replica_id: CardId,
    pub source_id: CardId,
    pub title: String,
    /// Number of individual changes in the patch (applied or, in dry-run,
    /// pending).
    pub changes: usize,
    pub failures: Vec<StepFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReversePair {
    pub pair: String,
    pub examined: usize,
    pub synced: Vec<SyncedCard>,
    pub skipped: Vec<CardSkip>,
    /// Set when the whole pair could not be processed.
    pub error: Option<String>,
}

impl ReversePair {
    pub(crate) fn new(pair: &str) -> Self {
        Self {
            pair: pair.to_string(),
            examined: 0,
            synced: Vec::new(),
            skipped: Vec::new(),
            error: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Phase 2: clear
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClearPair {
    pub pair: String,
    /// Cards deleted (or, in dry-run, that would be deleted).
    pub deleted: usize,
    pub failed: Vec<CardSkip>,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Phase 3: forward mirror
// ---------------------------------------------------------------------------

/// A source card replicated into the master list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirroredCard {
    pub source_id: CardId,
    /// `None` in dry-run mode.
    pub replica_id: Option<CardId>,
    pub title: String,
    pub failures: Vec<StepFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForwardPair {
    pub pair: String,
    pub evaluated: usize,
    pub mirrored: Vec<MirroredCard>,
    pub skipped: Vec<CardSkip>,
    pub error: Option<String>,
}

impl ForwardPair {
    pub(crate) fn new(pair: &str) -> Self {
        Self {
            pair: pair.to_string(),
            evaluated: 0,
            mirrored: Vec::new(),
            skipped: Vec::new(),
            error: None,
        }
    }
}
