use crate::activity::ActivityId;
use crate::program::EntryId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Malformed operation input. Rejected synchronously, never mutates state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("index {index} is out of range for {len} entries")]
    InvalidIndex { index: usize, len: usize },
    #[error("duration must be a positive number of minutes (got {minutes})")]
    NonPositiveDuration { minutes: i64 },
    #[error("duration of {minutes} minutes exceeds the {max} minute limit")]
    DurationTooLarge { minutes: i64, max: u32 },
    #[error("custom block title must not be empty")]
    EmptyTitle,
    #[error("program name must not be empty")]
    EmptyName,
    #[error("entry {0} not found")]
    UnknownEntry(EntryId),
    #[error("activity {0} not found in catalogue")]
    UnknownActivity(ActivityId),
    #[error("patch kind does not match entry {entry_id}")]
    PatchKindMismatch { entry_id: EntryId },
    #[error("a save is in progress; edits are locked until it completes")]
    SaveInProgress,
    #[error("no entry id left after {0}")]
    EntryIdsExhausted(EntryId),
    #[error("duplicate entry id {0}")]
    DuplicateEntryId(EntryId),
    #[error("entry positions must be contiguous from 0 (expected {expected}, found {found})")]
    NonContiguousPositions { expected: u32, found: u32 },
}

/// A program entry references an activity the catalogue no longer has.
///
/// Non-fatal: the entry is scheduled with zero duration and computation continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataIntegrityWarning {
    pub entry_id: EntryId,
    pub activity_id: ActivityId,
}

impl fmt::Display for DataIntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "entry {} references missing activity {}",
            self.entry_id, self.activity_id
        )
    }
}

/// The persistence collaborator rejected a save. Local state is untouched; retry is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to save program entries: {reason}")]
pub struct PersistenceFailure {
    pub reason: String,
}

impl PersistenceFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Outcome of [`BuilderSession::save`](crate::BuilderSession::save) when it does not succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SaveError {
    /// The session refused to start the save, e.g. another save is pending.
    /// The store was not called.
    #[error(transparent)]
    Rejected(#[from] ValidationError),
    #[error(transparent)]
    Failed(#[from] PersistenceFailure),
}
