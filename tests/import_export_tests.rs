use chrono::{NaiveDate, NaiveTime, Utc};
use scout_toolkit::{
    Activity, ActivityCatalog, Language, PersistenceError, Program, ProgramDetails, ProgramEntry,
    ProgramSnapshot, ValidationError, export_schedule_to_csv, load_catalog_from_json,
    load_program_from_json, save_catalog_to_json, save_program_to_json,
};
use std::io::Write;
use tempfile::NamedTempFile;

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn sample_program() -> Program {
    let mut details = ProgramDetails::new("Acampamento de Verão", t(10, 0));
    details.date = NaiveDate::from_ymd_opt(2025, 7, 12);
    details.is_public = true;
    Program::new(3, "chefe@escoteiros.pt", details, Utc::now()).unwrap()
}

fn sample_entries() -> Vec<ProgramEntry> {
    vec![
        ProgramEntry::activity(1, 0, 1),
        ProgramEntry::custom(2, 1, "Almoço, descanso", 60),
        ProgramEntry::activity(3, 2, 2),
    ]
}

fn sample_catalog() -> ActivityCatalog {
    let mut fire = Activity::new(1, "Fogueira", 90);
    fire.name.set(Language::En, "Campfire");
    ActivityCatalog::from_activities([fire, Activity::new(2, "Caminhada", 120)])
}

#[test]
fn program_snapshot_round_trips_through_json() {
    let snapshot = ProgramSnapshot::new(sample_program(), sample_entries()).unwrap();
    let tmp = NamedTempFile::new().unwrap();

    save_program_to_json(&snapshot, tmp.path()).unwrap();
    let loaded = load_program_from_json(tmp.path()).unwrap();

    assert_eq!(loaded, snapshot);
    assert_eq!(loaded.program.owner(), "chefe@escoteiros.pt");
}

#[test]
fn loading_a_snapshot_with_broken_positions_fails() {
    let mut tmp = NamedTempFile::new().unwrap();
    let program = serde_json::to_value(sample_program()).unwrap();
    let body = serde_json::json!({
        "program": program,
        "entries": [
            { "id": 1, "position": 0, "kind": "activity", "activity_id": 1 },
            { "id": 2, "position": 0, "kind": "custom", "title": "Lanche", "duration_minutes": 15 }
        ]
    });
    tmp.write_all(body.to_string().as_bytes()).unwrap();

    let err = load_program_from_json(tmp.path()).unwrap_err();
    assert!(matches!(
        err,
        PersistenceError::Validation(ValidationError::NonContiguousPositions { .. })
    ));
}

#[test]
fn custom_entry_without_duration_does_not_parse() {
    let mut tmp = NamedTempFile::new().unwrap();
    let program = serde_json::to_value(sample_program()).unwrap();
    let body = serde_json::json!({
        "program": program,
        "entries": [
            { "id": 1, "position": 0, "kind": "custom", "title": "Lanche" }
        ]
    });
    tmp.write_all(body.to_string().as_bytes()).unwrap();

    assert!(matches!(
        load_program_from_json(tmp.path()),
        Err(PersistenceError::Serialization(_))
    ));
}

#[test]
fn catalog_round_trips_and_rejects_duplicates() {
    let catalog = sample_catalog();
    let tmp = NamedTempFile::new().unwrap();
    save_catalog_to_json(catalog.iter(), tmp.path()).unwrap();

    let loaded = ActivityCatalog::from_activities(load_catalog_from_json(tmp.path()).unwrap());
    assert_eq!(loaded, catalog);

    let mut duplicate = NamedTempFile::new().unwrap();
    let body = serde_json::json!([
        { "id": 1, "name": { "pt": "Fogueira" }, "duration_minutes": 90 },
        { "id": 1, "name": { "pt": "Outra" }, "duration_minutes": 10 }
    ]);
    duplicate.write_all(body.to_string().as_bytes()).unwrap();
    assert!(matches!(
        load_catalog_from_json(duplicate.path()),
        Err(PersistenceError::InvalidData(_))
    ));
}

#[test]
fn schedule_exports_to_csv_file() {
    let tmp = NamedTempFile::new().unwrap();
    export_schedule_to_csv(
        tmp.path(),
        &sample_entries(),
        &sample_catalog(),
        t(10, 0),
        Language::En,
    )
    .unwrap();

    let text = std::fs::read_to_string(tmp.path()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[1], "0,10:00,11:30,90,activity,Campfire");
    assert_eq!(lines[2], "1,11:30,12:30,60,custom,\"Almoço, descanso\"");
    assert_eq!(lines[3], "2,12:30,14:30,120,activity,Caminhada");
}
