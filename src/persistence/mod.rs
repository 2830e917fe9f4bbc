use crate::entry_validation;
use crate::error::{PersistenceFailure, ValidationError};
use crate::program::{Program, ProgramDetails, ProgramEntry, ProgramId};
use serde_json::Error as SerdeJsonError;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] SerdeJsonError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("program {0} not found")]
    ProgramNotFound(ProgramId),
}

impl From<PersistenceError> for PersistenceFailure {
    fn from(value: PersistenceError) -> Self {
        PersistenceFailure::new(value.to_string())
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Storage for programs and their entries.
pub trait ProgramStore {
    fn create_program(&self, owner: &str, details: ProgramDetails) -> PersistenceResult<Program>;
    /// Overwrites the header of an existing program.
    fn update_program(&self, program: &Program) -> PersistenceResult<()>;
    fn load_program(&self, id: ProgramId) -> PersistenceResult<Option<Program>>;
    fn list_programs(&self) -> PersistenceResult<Vec<Program>>;
    /// Removes the program and its entries. Returns `false` when it did not exist.
    fn delete_program(&self, id: ProgramId) -> PersistenceResult<bool>;
    /// Replaces every entry of the program with `entries`.
    fn save_program_entries(
        &self,
        program_id: ProgramId,
        entries: &[ProgramEntry],
    ) -> PersistenceResult<()>;
    /// Entries in position order.
    fn load_program_entries(&self, program_id: ProgramId) -> PersistenceResult<Vec<ProgramEntry>>;
}

pub fn validate_entries(entries: &[ProgramEntry]) -> PersistenceResult<()> {
    entry_validation::validate_entry_collection(entries).map_err(PersistenceError::from)
}

pub mod file;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{
    ProgramSnapshot, export_schedule_to_csv, load_catalog_from_json, load_program_from_json,
    save_catalog_to_json, save_program_to_json, write_schedule_csv,
};
