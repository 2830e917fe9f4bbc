use super::{PersistenceError, PersistenceResult, ProgramStore};
use crate::program::{EntryKind, Program, ProgramDetails, ProgramEntry, ProgramId};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::sync::Mutex;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

pub struct SqliteProgramStore {
    connection: Mutex<Connection>,
}

/// Raw column values; parsed outside the rusqlite row closure.
struct ProgramRow {
    id: ProgramId,
    name: String,
    program_date: Option<String>,
    start_time: String,
    is_public: bool,
    owner: String,
    created_at: String,
    updated_at: String,
}

impl ProgramRow {
    const COLUMNS: &'static str =
        "id, name, program_date, start_time, is_public, owner, created_at, updated_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            program_date: row.get(2)?,
            start_time: row.get(3)?,
            is_public: row.get(4)?,
            owner: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_program(self) -> PersistenceResult<Program> {
        let details = ProgramDetails {
            name: self.name,
            date: self
                .program_date
                .as_deref()
                .map(parse_date)
                .transpose()?,
            start_time: parse_time(&self.start_time)?,
            is_public: self.is_public,
        };
        let mut program = Program::new(self.id, self.owner, details, parse_timestamp(&self.created_at)?)?;
        program.updated_at = parse_timestamp(&self.updated_at)?;
        Ok(program)
    }
}

struct EntryRow {
    id: i64,
    position: u32,
    kind: String,
    activity_id: Option<i64>,
    custom_title: Option<String>,
    custom_duration_minutes: Option<u32>,
}

impl EntryRow {
    fn into_entry(self) -> PersistenceResult<ProgramEntry> {
        let kind = match (self.kind.as_str(), self.activity_id, self.custom_title, self.custom_duration_minutes) {
            ("activity", Some(activity_id), None, None) => EntryKind::Activity { activity_id },
            ("custom", None, Some(title), Some(duration_minutes)) => EntryKind::Custom {
                title,
                duration_minutes,
            },
            (other, ..) => {
                return Err(PersistenceError::InvalidData(format!(
                    "entry {} has inconsistent columns for kind '{}'",
                    self.id, other
                )));
            }
        };
        Ok(ProgramEntry {
            id: self.id,
            position: self.position,
            kind,
        })
    }
}

impl SqliteProgramStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS programs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                program_date TEXT,
                start_time TEXT NOT NULL,
                is_public INTEGER NOT NULL DEFAULT 0,
                owner TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS program_entries (
                program_id INTEGER NOT NULL REFERENCES programs(id) ON DELETE CASCADE,
                id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('activity', 'custom')),
                activity_id INTEGER,
                custom_title TEXT,
                custom_duration_minutes INTEGER,
                PRIMARY KEY (program_id, id),
                UNIQUE (program_id, position),
                CHECK (
                    (kind = 'activity' AND activity_id IS NOT NULL
                        AND custom_title IS NULL AND custom_duration_minutes IS NULL)
                    OR
                    (kind = 'custom' AND activity_id IS NULL
                        AND custom_title IS NOT NULL AND custom_duration_minutes > 0)
                )
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    fn program_exists(conn: &Connection, id: ProgramId) -> PersistenceResult<bool> {
        let found: Option<i64> = conn
            .query_row("SELECT id FROM programs WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    fn insert_entries(
        tx: &rusqlite::Transaction,
        program_id: ProgramId,
        entries: &[ProgramEntry],
    ) -> PersistenceResult<()> {
        let mut stmt = tx.prepare(
            "INSERT INTO program_entries
                (program_id, id, position, kind, activity_id, custom_title, custom_duration_minutes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for entry in entries {
            let (activity_id, title, duration) = match &entry.kind {
                EntryKind::Activity { activity_id } => (Some(*activity_id), None, None),
                EntryKind::Custom {
                    title,
                    duration_minutes,
                } => (None, Some(title.as_str()), Some(*duration_minutes)),
            };
            stmt.execute(params![
                program_id,
                entry.id,
                entry.position,
                entry.kind.as_str(),
                activity_id,
                title,
                duration
            ])?;
        }
        Ok(())
    }
}

impl ProgramStore for SqliteProgramStore {
    fn create_program(&self, owner: &str, details: ProgramDetails) -> PersistenceResult<Program> {
        details.validate()?;
        let now = Utc::now();
        let conn = self.connection.lock().expect("sqlite mutex poisoned");
        conn.execute(
            "INSERT INTO programs (name, program_date, start_time, is_public, owner, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                details.name.trim(),
                details.date.map(format_date),
                format_time(details.start_time),
                details.is_public,
                owner,
                format_timestamp(now)
            ],
        )?;
        let id = conn.last_insert_rowid();
        tracing::info!(program_id = id, owner, "program created");
        Ok(Program::new(id, owner, details, now)?)
    }

    fn update_program(&self, program: &Program) -> PersistenceResult<()> {
        program.details().validate()?;
        let conn = self.connection.lock().expect("sqlite mutex poisoned");
        let changed = conn.execute(
            "UPDATE programs
             SET name = ?2, program_date = ?3, start_time = ?4, is_public = ?5, updated_at = ?6
             WHERE id = ?1 AND owner = ?7",
            params![
                program.id,
                program.name,
                program.date.map(format_date),
                format_time(program.start_time),
                program.is_public,
                format_timestamp(program.updated_at),
                program.owner()
            ],
        )?;
        if changed == 0 {
            if Self::program_exists(&conn, program.id)? {
                return Err(PersistenceError::InvalidData(format!(
                    "program {} owner cannot change",
                    program.id
                )));
            }
            return Err(PersistenceError::ProgramNotFound(program.id));
        }
        Ok(())
    }

    fn load_program(&self, id: ProgramId) -> PersistenceResult<Option<Program>> {
        let conn = self.connection.lock().expect("sqlite mutex poisoned");
        let sql = format!("SELECT {} FROM programs WHERE id = ?1", ProgramRow::COLUMNS);
        let row = conn
            .query_row(&sql, params![id], ProgramRow::from_row)
            .optional()?;
        row.map(ProgramRow::into_program).transpose()
    }

    fn list_programs(&self) -> PersistenceResult<Vec<Program>> {
        let conn = self.connection.lock().expect("sqlite mutex poisoned");
        let sql = format!("SELECT {} FROM programs ORDER BY id ASC", ProgramRow::COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], ProgramRow::from_row)?;

        let mut programs = Vec::new();
        for row in rows {
            programs.push(row?.into_program()?);
        }
        Ok(programs)
    }

    fn delete_program(&self, id: ProgramId) -> PersistenceResult<bool> {
        let conn = self.connection.lock().expect("sqlite mutex poisoned");
        let removed = conn.execute("DELETE FROM programs WHERE id = ?1", params![id])?;
        if removed > 0 {
            tracing::info!(program_id = id, "program deleted");
        }
        Ok(removed > 0)
    }

    fn save_program_entries(
        &self,
        program_id: ProgramId,
        entries: &[ProgramEntry],
    ) -> PersistenceResult<()> {
        super::validate_entries(entries)?;
        let mut conn = self.connection.lock().expect("sqlite mutex poisoned");
        if !Self::program_exists(&conn, program_id)? {
            return Err(PersistenceError::ProgramNotFound(program_id));
        }
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM program_entries WHERE program_id = ?1",
            params![program_id],
        )?;
        Self::insert_entries(&tx, program_id, entries)?;
        tx.execute(
            "UPDATE programs SET updated_at = ?2 WHERE id = ?1",
            params![program_id, format_timestamp(Utc::now())],
        )?;
        tx.commit()?;
        tracing::info!(program_id, entries = entries.len(), "program entries saved");
        Ok(())
    }

    fn load_program_entries(&self, program_id: ProgramId) -> PersistenceResult<Vec<ProgramEntry>> {
        let conn = self.connection.lock().expect("sqlite mutex poisoned");
        if !Self::program_exists(&conn, program_id)? {
            return Err(PersistenceError::ProgramNotFound(program_id));
        }
        let mut stmt = conn.prepare(
            "SELECT id, position, kind, activity_id, custom_title, custom_duration_minutes
             FROM program_entries WHERE program_id = ?1 ORDER BY position ASC",
        )?;
        let rows = stmt.query_map(params![program_id], |row| {
            Ok(EntryRow {
                id: row.get(0)?,
                position: row.get(1)?,
                kind: row.get(2)?,
                activity_id: row.get(3)?,
                custom_title: row.get(4)?,
                custom_duration_minutes: row.get(5)?,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.into_entry()?);
        }
        Ok(entries)
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(input: &str) -> PersistenceResult<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
        .map_err(|e| PersistenceError::InvalidData(format!("invalid date '{input}': {e}")))
}

fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

fn parse_time(input: &str) -> PersistenceResult<NaiveTime> {
    NaiveTime::parse_from_str(input.trim(), TIME_FORMAT)
        .map_err(|e| PersistenceError::InvalidData(format!("invalid time '{input}': {e}")))
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339()
}

fn parse_timestamp(input: &str) -> PersistenceResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(input.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| PersistenceError::InvalidData(format!("invalid timestamp '{input}': {e}")))
}
