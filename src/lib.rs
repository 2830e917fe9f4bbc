pub mod access;
pub mod activity;
pub mod calculations;
pub mod catalog;
pub mod config;
pub(crate) mod entry_validation;
pub mod error;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod localized;
pub mod persistence;
pub mod program;
pub mod session;

pub use access::{AccessError, AccessPolicy, Identity, Role};
pub use activity::{
    Activity, ActivityId, ActivityLookup, AgeGroup, EducationalGoal, EffortLevel, GroupSize,
    LocalizedActivity, Location, Sdg, UnknownCategory,
};
pub use calculations::reorder::{renumber, reorder};
pub use calculations::summary::{Distribution, ProgramSummary, Tally, summarize};
pub use calculations::timeline::{ScheduledEntry, Timeline, compute_timeline};
pub use catalog::{ActivityCatalog, ActivityFilter, Page, PageRequest};
pub use config::{ConfigError, ToolkitConfig};
pub use error::{DataIntegrityWarning, PersistenceFailure, SaveError, ValidationError};
pub use localized::{Language, LocalizedText};
pub use persistence::memory::InMemoryProgramStore;
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqliteProgramStore;
pub use persistence::{
    PersistenceError, PersistenceResult, ProgramSnapshot, ProgramStore, export_schedule_to_csv,
    load_catalog_from_json, load_program_from_json, save_catalog_to_json, save_program_to_json,
    write_schedule_csv,
};
pub use program::{EntryId, EntryKind, EntryPatch, Program, ProgramDetails, ProgramEntry, ProgramId};
pub use session::{BuilderSession, PendingSave, SessionState};
