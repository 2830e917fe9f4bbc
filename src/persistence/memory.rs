use super::{PersistenceError, PersistenceResult, ProgramStore};
use crate::program::{Program, ProgramDetails, ProgramEntry, ProgramId};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

#[derive(Default)]
struct MemoryState {
    last_id: ProgramId,
    programs: BTreeMap<ProgramId, Program>,
    entries: HashMap<ProgramId, Vec<ProgramEntry>>,
}

/// Process-local store, used when no database is configured and in tests.
#[derive(Default)]
pub struct InMemoryProgramStore {
    state: Mutex<MemoryState>,
}

impl InMemoryProgramStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgramStore for InMemoryProgramStore {
    fn create_program(&self, owner: &str, details: ProgramDetails) -> PersistenceResult<Program> {
        let mut state = self.state.lock().expect("memory store mutex poisoned");
        let id = state.last_id + 1;
        let program = Program::new(id, owner, details, Utc::now())?;
        state.last_id = id;
        state.programs.insert(id, program.clone());
        tracing::info!(program_id = id, owner, "program created");
        Ok(program)
    }

    fn update_program(&self, program: &Program) -> PersistenceResult<()> {
        let mut state = self.state.lock().expect("memory store mutex poisoned");
        let Some(existing) = state.programs.get_mut(&program.id) else {
            return Err(PersistenceError::ProgramNotFound(program.id));
        };
        if existing.owner() != program.owner() {
            return Err(PersistenceError::InvalidData(format!(
                "program {} owner cannot change",
                program.id
            )));
        }
        *existing = program.clone();
        Ok(())
    }

    fn load_program(&self, id: ProgramId) -> PersistenceResult<Option<Program>> {
        let state = self.state.lock().expect("memory store mutex poisoned");
        Ok(state.programs.get(&id).cloned())
    }

    fn list_programs(&self) -> PersistenceResult<Vec<Program>> {
        let state = self.state.lock().expect("memory store mutex poisoned");
        Ok(state.programs.values().cloned().collect())
    }

    fn delete_program(&self, id: ProgramId) -> PersistenceResult<bool> {
        let mut state = self.state.lock().expect("memory store mutex poisoned");
        state.entries.remove(&id);
        Ok(state.programs.remove(&id).is_some())
    }

    fn save_program_entries(
        &self,
        program_id: ProgramId,
        entries: &[ProgramEntry],
    ) -> PersistenceResult<()> {
        super::validate_entries(entries)?;
        let mut state = self.state.lock().expect("memory store mutex poisoned");
        let Some(program) = state.programs.get_mut(&program_id) else {
            return Err(PersistenceError::ProgramNotFound(program_id));
        };
        program.updated_at = Utc::now();

        let mut ordered = entries.to_vec();
        ordered.sort_by_key(|entry| entry.position);
        state.entries.insert(program_id, ordered);
        Ok(())
    }

    fn load_program_entries(&self, program_id: ProgramId) -> PersistenceResult<Vec<ProgramEntry>> {
        let state = self.state.lock().expect("memory store mutex poisoned");
        if !state.programs.contains_key(&program_id) {
            return Err(PersistenceError::ProgramNotFound(program_id));
        }
        Ok(state.entries.get(&program_id).cloned().unwrap_or_default())
    }
}
