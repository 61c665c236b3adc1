//! # boardsync-sync
//!
//! Card replication and bidirectional synchronization.
//!
//! A run ([`pipeline::run`]) has three strictly ordered phases:
//!
//! 1. [`reverse`]: rescue human edits made on master replicas by patching
//!    the source cards they were mirrored from.
//! 2. clear: delete every card in each master list.
//! 3. [`mirror`]: re-create replicas for every source card that passes
//!    [`eligibility`], embedding provenance via [`metadata`].
//!
//! Item-level failures are collected into [`summary`] values; they never
//! abort a phase, and a failed phase never aborts the next one.

pub mod diff;
pub mod eligibility;
pub mod error;
pub mod metadata;
pub mod mirror;
pub mod pipeline;
pub mod reverse;
pub mod summary;

pub use error::SyncError;
pub use pipeline::{run, RunSummary};
pub use summary::{SkipReason, Step, StepFailure};
