use super::{PersistenceError, PersistenceResult};
use crate::activity::{Activity, ActivityLookup};
use crate::calculations::timeline::compute_timeline;
use crate::localized::Language;
use crate::program::{Program, ProgramEntry};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io;
use std::path::Path;

/// A program with its entries, as written to and read from JSON files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramSnapshot {
    pub program: Program,
    #[serde(default)]
    pub entries: Vec<ProgramEntry>,
}

impl ProgramSnapshot {
    pub fn new(program: Program, entries: Vec<ProgramEntry>) -> PersistenceResult<Self> {
        super::validate_entries(&entries)?;
        Ok(Self { program, entries })
    }

    fn into_checked(mut self) -> PersistenceResult<Self> {
        super::validate_entries(&self.entries)?;
        self.entries.sort_by_key(|entry| entry.position);
        Ok(self)
    }
}

pub fn save_program_to_json<P: AsRef<Path>>(
    snapshot: &ProgramSnapshot,
    path: P,
) -> PersistenceResult<()> {
    super::validate_entries(&snapshot.entries)?;
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, snapshot)?;
    Ok(())
}

pub fn load_program_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<ProgramSnapshot> {
    let file = File::open(path)?;
    let snapshot: ProgramSnapshot = serde_json::from_reader(file)?;
    snapshot.into_checked()
}

/// Reads a catalogue file: a JSON array of activities with unique ids.
pub fn load_catalog_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<Activity>> {
    let file = File::open(path)?;
    let activities: Vec<Activity> = serde_json::from_reader(file)?;

    let mut seen = HashSet::with_capacity(activities.len());
    for activity in &activities {
        if activity.name.is_empty() {
            return Err(PersistenceError::InvalidData(format!(
                "activity {} has no name",
                activity.id
            )));
        }
        if !seen.insert(activity.id) {
            return Err(PersistenceError::InvalidData(format!(
                "duplicate activity id {}",
                activity.id
            )));
        }
    }
    Ok(activities)
}

pub fn save_catalog_to_json<'a, P, I>(activities: I, path: P) -> PersistenceResult<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a Activity>,
{
    let activities: Vec<&Activity> = activities.into_iter().collect();
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &activities)?;
    Ok(())
}

#[derive(Serialize)]
struct ScheduleCsvRecord {
    position: u32,
    start: String,
    end: String,
    duration_minutes: u32,
    kind: &'static str,
    title: String,
}

/// Writes the computed schedule as CSV, one row per entry in position order.
///
/// Activity titles are resolved in `language`; entries whose activity is gone
/// keep their row with a zero duration.
pub fn write_schedule_csv<W, L>(
    writer: W,
    entries: &[ProgramEntry],
    lookup: &L,
    start: NaiveTime,
    language: Language,
) -> PersistenceResult<()>
where
    W: io::Write,
    L: ActivityLookup + ?Sized,
{
    super::validate_entries(entries)?;
    let timeline = compute_timeline(entries, lookup, start);
    let by_id: HashMap<_, _> = entries.iter().map(|entry| (entry.id, entry)).collect();

    let mut csv_writer = csv::Writer::from_writer(writer);
    for slot in &timeline.slots {
        let Some(entry) = by_id.get(&slot.entry_id) else {
            continue;
        };
        csv_writer.serialize(ScheduleCsvRecord {
            position: slot.position,
            start: slot.start.format("%H:%M").to_string(),
            end: slot.end.format("%H:%M").to_string(),
            duration_minutes: slot.duration_minutes,
            kind: entry.kind.as_str(),
            title: entry.display_title(lookup, language),
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn export_schedule_to_csv<P, L>(
    path: P,
    entries: &[ProgramEntry],
    lookup: &L,
    start: NaiveTime,
    language: Language,
) -> PersistenceResult<()>
where
    P: AsRef<Path>,
    L: ActivityLookup + ?Sized,
{
    let file = File::create(path)?;
    write_schedule_csv(file, entries, lookup, start, language)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn csv_rows_follow_the_timeline() {
        let mut catalog = BTreeMap::new();
        let mut game = Activity::new(1, "Jogo do lenço", 30);
        game.name.set(Language::En, "Flag game");
        catalog.insert(1, game);

        let entries = vec![
            ProgramEntry::activity(1, 0, 1),
            ProgramEntry::custom(2, 1, "Lanche", 15),
            ProgramEntry::activity(3, 2, 99),
        ];
        let mut buffer = Vec::new();
        write_schedule_csv(
            &mut buffer,
            &entries,
            &catalog,
            NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            Language::En,
        )
        .unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "position,start,end,duration_minutes,kind,title");
        assert_eq!(lines[1], "0,14:00,14:30,30,activity,Flag game");
        assert_eq!(lines[2], "1,14:30,14:45,15,custom,Lanche");
        assert_eq!(lines[3], "2,14:45,14:45,0,activity,activity 99 (missing)");
    }
}
