use chrono::NaiveTime;
use scout_toolkit::{
    ActivityCatalog, ActivityLookup, BuilderSession, EntryPatch, Identity, InMemoryProgramStore,
    Language, ProgramDetails, ProgramId, ProgramStore, ToolkitConfig, export_schedule_to_csv,
    load_catalog_from_json,
};
use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_PROGRAM_NAME: &str = "Programa";

#[derive(Debug, Default)]
struct CliArgs {
    catalog: Option<PathBuf>,
    program: Option<ProgramId>,
    user: Option<String>,
    name: Option<String>,
    start: Option<NaiveTime>,
}

fn parse_args<I: Iterator<Item = String>>(mut args: I) -> Result<CliArgs, String> {
    let mut parsed = CliArgs::default();
    while let Some(flag) = args.next() {
        let mut value = || {
            args.next()
                .ok_or_else(|| format!("missing value for {flag}"))
        };
        match flag.as_str() {
            "--catalog" => parsed.catalog = Some(PathBuf::from(value()?)),
            "--program" => {
                let raw = value()?;
                parsed.program = Some(
                    raw.parse()
                        .map_err(|_| format!("invalid program id '{raw}'"))?,
                );
            }
            "--user" => parsed.user = Some(value()?),
            "--name" => parsed.name = Some(value()?),
            "--start" => {
                let raw = value()?;
                parsed.start = Some(
                    NaiveTime::parse_from_str(&raw, "%H:%M")
                        .map_err(|_| format!("invalid start time '{raw}' (HH:MM)"))?,
                );
            }
            other => return Err(format!("unknown argument '{other}'")),
        }
    }
    Ok(parsed)
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (ci, cell) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(cell.chars().count());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(headers.iter().copied(), &widths));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in rows {
        out.push_str(&render_row(row.iter().map(String::as_str), &widths));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn render_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let mut line = String::from("|");
    for (ci, cell) in cells.enumerate() {
        line.push(' ');
        line.push_str(cell);
        line.push_str(&" ".repeat(widths[ci].saturating_sub(cell.chars().count())));
        line.push_str(" |");
    }
    line
}

fn render_schedule<L: ActivityLookup>(session: &BuilderSession<L>, language: Language) -> String {
    let rows: Vec<Vec<String>> = session
        .timeline()
        .slots
        .iter()
        .filter_map(|slot| {
            let entry = session.find_entry(slot.entry_id)?;
            Some(vec![
                entry.id.to_string(),
                slot.position.to_string(),
                slot.start.format("%H:%M").to_string(),
                slot.end.format("%H:%M").to_string(),
                slot.duration_minutes.to_string(),
                entry.kind.as_str().to_string(),
                entry.display_title(session.lookup(), language),
            ])
        })
        .collect();
    render_table(
        &["id", "position", "start", "end", "minutes", "kind", "title"],
        &rows,
    )
}

fn render_activities(catalog: &ActivityCatalog, language: Language) -> String {
    let rows: Vec<Vec<String>> = catalog
        .iter()
        .map(|activity| {
            vec![
                activity.id.to_string(),
                activity.name.resolve(language).to_string(),
                activity.duration_minutes.to_string(),
                activity.group_size.to_string(),
                activity.effort_level.to_string(),
                activity.location.to_string(),
                activity.age_group.to_string(),
            ]
        })
        .collect();
    render_table(
        &["id", "name", "minutes", "group", "effort", "location", "age"],
        &rows,
    )
}

fn print_help() {
    println!(
        "Commands:\n  help                         Show this help\n  show                         Show the schedule\n  summary                      Show program totals, goals and SDGs\n  activities                   List the activity catalogue\n  add <activity_id>            Append a catalogue activity\n  custom <minutes> <title...>  Append a custom block\n  remove <entry_id>            Remove an entry\n  move <from> <to>             Move the entry at index <from> to index <to>\n  title <entry_id> <text...>   Rename a custom block\n  minutes <entry_id> <n>       Change a custom block's duration\n  save                         Save entries to the store\n  export <path>                Export the schedule as CSV\n  quit|exit                    Exit (unsaved edits are discarded)"
    );
}

fn open_store(config: &ToolkitConfig) -> Result<Box<dyn ProgramStore>, Box<dyn Error>> {
    match &config.database {
        #[cfg(feature = "sqlite")]
        Some(path) => Ok(Box::new(scout_toolkit::SqliteProgramStore::new(path)?)),
        #[cfg(not(feature = "sqlite"))]
        Some(_) => {
            eprintln!("Built without the `sqlite` feature; programs are kept in memory.");
            Ok(Box::new(InMemoryProgramStore::new()))
        }
        None => Ok(Box::new(InMemoryProgramStore::new())),
    }
}

fn open_session(
    store: &dyn ProgramStore,
    identity: &Identity,
    config: &ToolkitConfig,
    args: &CliArgs,
    catalog: ActivityCatalog,
) -> Result<BuilderSession<ActivityCatalog>, Box<dyn Error>> {
    match args.program {
        Some(program_id) => {
            let program = store
                .load_program(program_id)?
                .ok_or_else(|| format!("program {program_id} not found"))?;
            if !config.access_policy().can_edit(identity, &program) {
                return Err(format!("program {program_id} belongs to {}", program.owner()).into());
            }
            let entries = store.load_program_entries(program_id)?;
            Ok(BuilderSession::with_entries(program, entries, catalog)?)
        }
        None => {
            let name = args.name.as_deref().unwrap_or(DEFAULT_PROGRAM_NAME);
            let start = args
                .start
                .or_else(|| NaiveTime::from_hms_opt(9, 0, 0))
                .ok_or("invalid default start time")?;
            let program = store.create_program(&identity.email, ProgramDetails::new(name, start))?;
            Ok(BuilderSession::new(program, catalog))
        }
    }
}

fn parse_id(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.parse().ok())
}

fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scout_toolkit=info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    let config = ToolkitConfig::from_env()?;
    let language = config.default_language;

    let catalog = match args.catalog.as_ref().or(config.catalog.as_ref()) {
        Some(path) => ActivityCatalog::from_activities(load_catalog_from_json(path)?),
        None => ActivityCatalog::new(),
    };

    let policy = config.access_policy();
    let user = args
        .user
        .clone()
        .unwrap_or_else(|| format!("leader@{}", policy.allowed_domain()));
    let identity = policy.sign_in(&user)?;

    let store = open_store(&config)?;
    let mut session = open_session(store.as_ref(), &identity, &config, &args, catalog)?;

    println!("Scout Toolkit (CLI) - type 'help' for commands\n");
    println!(
        "Program {}: {} (starts {})",
        session.program().id,
        session.program().name,
        session.program().start_time.format("%H:%M")
    );
    println!("{}", render_schedule(&session, language));

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "show" => println!("{}", render_schedule(&session, language)),
            "summary" => {
                println!("{}", session.summary().to_cli_summary());
                for warning in &session.summary().warnings {
                    println!("Warning: {warning}");
                }
            }
            "activities" => println!("{}", render_activities(session.lookup(), language)),
            "add" => match parse_id(parts.next()) {
                Some(activity_id) => match session.add_activity(activity_id) {
                    Ok(entry_id) => {
                        println!("Added entry {entry_id}.");
                        println!("{}", render_schedule(&session, language));
                    }
                    Err(e) => println!("Error: {e}"),
                },
                None => println!("Usage: add <activity_id>"),
            },
            "custom" => {
                let minutes = parts.next().and_then(|s| s.parse::<i64>().ok());
                let title = parts.collect::<Vec<_>>().join(" ");
                match minutes {
                    Some(minutes) if !title.is_empty() => {
                        match session.add_custom_block(&title, minutes) {
                            Ok(entry_id) => {
                                println!("Added entry {entry_id}.");
                                println!("{}", render_schedule(&session, language));
                            }
                            Err(e) => println!("Error: {e}"),
                        }
                    }
                    _ => println!("Usage: custom <minutes> <title...>"),
                }
            }
            "remove" => match parse_id(parts.next()) {
                Some(entry_id) => match session.remove_entry(entry_id) {
                    Ok(_) => {
                        println!("Removed entry {entry_id}.");
                        println!("{}", render_schedule(&session, language));
                    }
                    Err(e) => println!("Error: {e}"),
                },
                None => println!("Usage: remove <entry_id>"),
            },
            "move" => {
                let from = parts.next().and_then(|s| s.parse::<usize>().ok());
                let to = parts.next().and_then(|s| s.parse::<usize>().ok());
                match (from, to) {
                    (Some(from), Some(to)) => match session.move_entry(from, to) {
                        Ok(()) => {
                            println!("Moved entry from {from} to {to}.");
                            println!("{}", render_schedule(&session, language));
                        }
                        Err(e) => println!("Error: {e}"),
                    },
                    _ => println!("Usage: move <from> <to>"),
                }
            }
            "title" => {
                let entry_id = parse_id(parts.next());
                let text = parts.collect::<Vec<_>>().join(" ");
                match entry_id {
                    Some(entry_id) if !text.is_empty() => {
                        let patch = EntryPatch::Custom {
                            title: Some(text),
                            duration_minutes: None,
                        };
                        match session.update_entry(entry_id, patch) {
                            Ok(()) => {
                                println!("Updated entry {entry_id}.");
                                println!("{}", render_schedule(&session, language));
                            }
                            Err(e) => println!("Error: {e}"),
                        }
                    }
                    _ => println!("Usage: title <entry_id> <text...>"),
                }
            }
            "minutes" => {
                let entry_id = parse_id(parts.next());
                let minutes = parts.next().and_then(|s| s.parse::<i64>().ok());
                match (entry_id, minutes) {
                    (Some(entry_id), Some(minutes)) => {
                        let patch = EntryPatch::Custom {
                            title: None,
                            duration_minutes: Some(minutes),
                        };
                        match session.update_entry(entry_id, patch) {
                            Ok(()) => {
                                println!("Updated entry {entry_id}.");
                                println!("{}", render_schedule(&session, language));
                            }
                            Err(e) => println!("Error: {e}"),
                        }
                    }
                    _ => println!("Usage: minutes <entry_id> <n>"),
                }
            }
            "save" => match session.save(store.as_ref()) {
                Ok(()) => println!("Saved {} entries.", session.entries().len()),
                Err(e) => println!("Error: {e}"),
            },
            "export" => match parts.next() {
                Some(path) => {
                    let result = export_schedule_to_csv(
                        path,
                        session.entries(),
                        session.lookup(),
                        session.program().start_time,
                        language,
                    );
                    match result {
                        Ok(()) => println!("Exported schedule to {path}."),
                        Err(e) => println!("Error: {e}"),
                    }
                }
                None => println!("Usage: export <path>"),
            },
            other => println!("Unknown command '{other}'. Type 'help' for commands."),
        }
    }

    if session.is_dirty() {
        println!("Discarding unsaved changes.");
    }
    Ok(())
}
