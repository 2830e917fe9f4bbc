use crate::activity::{ActivityId, ActivityLookup};
use crate::calculations::reorder::{renumber, reorder};
use crate::calculations::summary::{ProgramSummary, summarize};
use crate::calculations::timeline::{Timeline, compute_timeline};
use crate::entry_validation::{
    validate_custom_duration, validate_custom_title, validate_entry_collection,
};
use crate::error::{PersistenceFailure, SaveError, ValidationError};
use crate::persistence::ProgramStore;
use crate::program::{EntryId, EntryKind, EntryPatch, Program, ProgramEntry, ProgramId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Populated,
}

/// Entries captured by [`BuilderSession::begin_save`]. Hand them to the store,
/// then report the outcome with [`BuilderSession::finish_save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSave {
    program_id: ProgramId,
    revision: u64,
    entries: Vec<ProgramEntry>,
}

impl PendingSave {
    pub fn program_id(&self) -> ProgramId {
        self.program_id
    }

    pub fn entries(&self) -> &[ProgramEntry] {
        &self.entries
    }
}

/// Working copy of one program's entries.
///
/// Edits are local and always consistent: every successful mutation
/// recomputes the timeline and the summary before returning. Nothing reaches
/// the store until [`save`](Self::save); dropping the session discards
/// unsaved edits.
#[derive(Debug, Clone)]
pub struct BuilderSession<L> {
    program: Program,
    entries: Vec<ProgramEntry>,
    lookup: L,
    timeline: Timeline,
    summary: ProgramSummary,
    revision: u64,
    saved_revision: u64,
    saving: bool,
}

impl<L: ActivityLookup> BuilderSession<L> {
    pub fn new(program: Program, lookup: L) -> Self {
        let timeline = Timeline::empty(program.start_time);
        let summary = ProgramSummary::empty(program.start_time);
        Self {
            program,
            entries: Vec::new(),
            lookup,
            timeline,
            summary,
            revision: 0,
            saved_revision: 0,
            saving: false,
        }
    }

    /// Opens a session over entries loaded from storage. They count as saved.
    pub fn with_entries(
        program: Program,
        mut entries: Vec<ProgramEntry>,
        lookup: L,
    ) -> Result<Self, ValidationError> {
        validate_entry_collection(&entries)?;
        entries.sort_by_key(|entry| entry.position);
        let mut session = Self::new(program, lookup);
        session.entries = entries;
        session.refresh();
        Ok(session)
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Entries in position order.
    pub fn entries(&self) -> &[ProgramEntry] {
        &self.entries
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn summary(&self) -> &ProgramSummary {
        &self.summary
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    pub fn state(&self) -> SessionState {
        if self.entries.is_empty() {
            SessionState::Empty
        } else {
            SessionState::Populated
        }
    }

    /// True when there are edits the store has not acknowledged.
    pub fn is_dirty(&self) -> bool {
        self.revision != self.saved_revision
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn find_entry(&self, entry_id: EntryId) -> Option<&ProgramEntry> {
        self.entries.iter().find(|entry| entry.id == entry_id)
    }

    pub fn add_activity(&mut self, activity_id: ActivityId) -> Result<EntryId, ValidationError> {
        self.ensure_editable()?;
        if self.lookup.get_activity(activity_id).is_none() {
            return Err(ValidationError::UnknownActivity(activity_id));
        }
        let entry = ProgramEntry::activity(self.next_entry_id()?, self.next_position(), activity_id);
        Ok(self.push(entry))
    }

    pub fn add_custom_block(
        &mut self,
        title: &str,
        duration_minutes: i64,
    ) -> Result<EntryId, ValidationError> {
        self.ensure_editable()?;
        let duration_minutes = validate_custom_duration(duration_minutes)?;
        let title = validate_custom_title(title)?;
        let entry = ProgramEntry::custom(
            self.next_entry_id()?,
            self.next_position(),
            title,
            duration_minutes,
        );
        Ok(self.push(entry))
    }

    /// Deletes the entry and closes the gap it leaves in the positions.
    pub fn remove_entry(&mut self, entry_id: EntryId) -> Result<ProgramEntry, ValidationError> {
        self.ensure_editable()?;
        let index = self.index_of(entry_id)?;
        let removed = self.entries.remove(index);
        renumber(&mut self.entries);
        tracing::debug!(program_id = self.program.id, entry_id, "entry removed");
        self.touch();
        Ok(removed)
    }

    pub fn move_entry(&mut self, from: usize, to: usize) -> Result<(), ValidationError> {
        self.ensure_editable()?;
        self.entries = reorder(&self.entries, from, to)?;
        tracing::debug!(program_id = self.program.id, from, to, "entry moved");
        self.touch();
        Ok(())
    }

    /// Edits an entry in place. The patch must be of the entry's kind.
    pub fn update_entry(&mut self, entry_id: EntryId, patch: EntryPatch) -> Result<(), ValidationError> {
        self.ensure_editable()?;
        let index = self.index_of(entry_id)?;

        let kind = match (&self.entries[index].kind, patch) {
            (EntryKind::Activity { .. }, EntryPatch::Activity { activity_id }) => {
                if self.lookup.get_activity(activity_id).is_none() {
                    return Err(ValidationError::UnknownActivity(activity_id));
                }
                EntryKind::Activity { activity_id }
            }
            (
                EntryKind::Custom {
                    title: current_title,
                    duration_minutes: current_minutes,
                },
                EntryPatch::Custom {
                    title,
                    duration_minutes,
                },
            ) => EntryKind::Custom {
                title: match title {
                    Some(title) => validate_custom_title(&title)?,
                    None => current_title.clone(),
                },
                duration_minutes: match duration_minutes {
                    Some(minutes) => validate_custom_duration(minutes)?,
                    None => *current_minutes,
                },
            },
            _ => return Err(ValidationError::PatchKindMismatch { entry_id }),
        };

        self.entries[index].kind = kind;
        tracing::debug!(program_id = self.program.id, entry_id, "entry updated");
        self.touch();
        Ok(())
    }

    /// Snapshots the entries and locks edits until [`finish_save`](Self::finish_save).
    pub fn begin_save(&mut self) -> Result<PendingSave, ValidationError> {
        self.ensure_editable()?;
        self.saving = true;
        Ok(PendingSave {
            program_id: self.program.id,
            revision: self.revision,
            entries: self.entries.clone(),
        })
    }

    /// Releases the edit lock. Local entries are never rolled back; on failure
    /// they stay dirty and the save can be retried.
    pub fn finish_save(
        &mut self,
        pending: PendingSave,
        outcome: Result<(), PersistenceFailure>,
    ) -> Result<(), PersistenceFailure> {
        self.saving = false;
        match outcome {
            Ok(()) => {
                self.saved_revision = pending.revision;
                tracing::info!(
                    program_id = pending.program_id,
                    entries = pending.entries.len(),
                    "program saved"
                );
                Ok(())
            }
            Err(failure) => {
                tracing::warn!(
                    program_id = pending.program_id,
                    reason = %failure.reason,
                    "program save failed"
                );
                Err(failure)
            }
        }
    }

    /// Writes the current entries through `store`. No automatic retry.
    pub fn save<S>(&mut self, store: &S) -> Result<(), SaveError>
    where
        S: ProgramStore + ?Sized,
    {
        let pending = self.begin_save()?;
        let outcome = store
            .save_program_entries(pending.program_id, &pending.entries)
            .map_err(PersistenceFailure::from);
        Ok(self.finish_save(pending, outcome)?)
    }

    fn ensure_editable(&self) -> Result<(), ValidationError> {
        if self.saving {
            return Err(ValidationError::SaveInProgress);
        }
        Ok(())
    }

    fn index_of(&self, entry_id: EntryId) -> Result<usize, ValidationError> {
        self.entries
            .iter()
            .position(|entry| entry.id == entry_id)
            .ok_or(ValidationError::UnknownEntry(entry_id))
    }

    fn next_entry_id(&self) -> Result<EntryId, ValidationError> {
        let highest = self.entries.iter().map(|entry| entry.id).max().unwrap_or(0);
        highest
            .checked_add(1)
            .ok_or(ValidationError::EntryIdsExhausted(highest))
    }

    fn next_position(&self) -> u32 {
        self.entries.len() as u32
    }

    fn push(&mut self, entry: ProgramEntry) -> EntryId {
        let entry_id = entry.id;
        tracing::debug!(
            program_id = self.program.id,
            entry_id,
            kind = entry.kind.as_str(),
            "entry added"
        );
        self.entries.push(entry);
        self.touch();
        entry_id
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.refresh();
    }

    fn refresh(&mut self) {
        let start = self.program.start_time;
        self.timeline = compute_timeline(&self.entries, &self.lookup, start);
        self.summary = summarize(&self.entries, &self.lookup, start);
    }
}
