//! Command-line front end for the checklist core.
//!
//! # Responsibility
//! - Turn command-line input into core calls and print plain-text results.
//! - Read/write import and export files; the core never touches them.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use checklist_core::db::open_db;
use checklist_core::{
    export_file_name, init_logging, ChecklistStore, ConfigOverrides, CoreConfig,
    SqliteCollectionRepository, SubmittedForm,
};
use clap::{Parser, Subcommand, ValueEnum};
use log::warn;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "checklists", version, about = "Manage aircraft checklists")]
struct Cli {
    /// SQLite database file (env: CHECKLISTS_DB_PATH).
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Log level: trace|debug|info|warn|error (env: CHECKLISTS_LOG_LEVEL).
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Absolute log directory (env: CHECKLISTS_LOG_DIR).
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List checklists with progress, optionally for one aircraft.
    List {
        #[arg(long, default_value = "")]
        aircraft: String,
    },
    /// List known aircraft labels.
    Aircraft,
    /// Print one checklist as JSON.
    Show { id: u64 },
    /// Create a checklist from a JSON form file.
    Create { form: PathBuf },
    /// Replace a checklist's structure from a JSON form file.
    Update { id: u64, form: PathBuf },
    Delete { id: u64 },
    /// Flip one item's completion flag.
    Toggle {
        checklist: u64,
        section: u64,
        item: u64,
    },
    /// Mark every item of a checklist as not completed.
    Reset { id: u64 },
    /// Append checklists from an export file.
    Import { file: PathBuf },
    /// Write all checklists to a file in `dir` named after the UTC date.
    Export {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Show or change the dark-mode preference.
    DarkMode { action: Option<DarkModeAction> },
}

#[derive(Clone, Copy, ValueEnum)]
enum DarkModeAction {
    On,
    Off,
    Toggle,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = CoreConfig::resolve(ConfigOverrides {
        db_path: cli.db,
        log_level: cli.log_level,
        log_dir: cli.log_dir,
    });
    if let Err(err) = init_logging(&config.log_level, &config.log_dir) {
        eprintln!("logging disabled: {err}");
    }

    let conn = open_db(&config.db_path)
        .with_context(|| format!("opening {}", config.db_path.display()))?;
    let repo = SqliteCollectionRepository::try_new(&conn)?;
    let mut store = ChecklistStore::open(repo)?;

    run(&mut store, cli.command)
}

fn run(store: &mut ChecklistStore<SqliteCollectionRepository<'_>>, command: Command) -> Result<()> {
    match command {
        Command::List { aircraft } => {
            let listed = store.list_by_aircraft(&aircraft);
            if store.is_empty() {
                println!("No checklists yet.");
            } else if listed.is_empty() {
                println!("No checklist found for aircraft `{aircraft}`.");
            }
            for entry in listed {
                let checklist = entry.checklist;
                println!(
                    "{:>16}  {}{}  {}/{} ({}%)",
                    checklist.id,
                    checklist.title,
                    checklist
                        .aircraft
                        .as_deref()
                        .map(|label| format!(" [{label}]"))
                        .unwrap_or_default(),
                    entry.completed_count,
                    entry.total_count,
                    entry.percent()
                );
            }
        }
        Command::Aircraft => {
            for label in store.distinct_aircraft() {
                println!("{label}");
            }
        }
        Command::Show { id } => {
            let Some(checklist) = store.get(id) else {
                bail!("checklist not found: {id}");
            };
            println!("{}", serde_json::to_string_pretty(checklist)?);
        }
        Command::Create { form } => {
            let form = read_form(&form)?;
            let created = store.create(&form)?;
            println!("created {}", created.id);
        }
        Command::Update { id, form } => {
            let form = read_form(&form)?;
            let updated = store.update(id, &form)?;
            let (done, total) = updated.progress_counts();
            println!("updated {} ({done}/{total} kept completed)", updated.id);
        }
        Command::Delete { id } => {
            if store.delete(id)? {
                println!("deleted {id}");
            } else {
                println!("nothing to delete");
            }
        }
        Command::Toggle {
            checklist,
            section,
            item,
        } => match store.toggle_item(checklist, section, item)? {
            Some(true) => println!("checked"),
            Some(false) => println!("unchecked"),
            None => {
                warn!("event=cli_toggle module=cli status=noop");
                println!("no such item");
            }
        },
        Command::Reset { id } => {
            if store.reset_checklist(id)? {
                println!("reset {id}");
            }
        }
        Command::Import { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let ids = store.import_json(&text)?;
            println!("imported {} checklist(s)", ids.len());
        }
        Command::Export { dir } => {
            let path = export_path(&dir, Utc::now());
            std::fs::write(&path, store.export_json()?)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("{}", path.display());
        }
        Command::DarkMode { action } => {
            let enabled = match action {
                None => store.dark_mode(),
                Some(DarkModeAction::On) => {
                    store.set_dark_mode(true)?;
                    true
                }
                Some(DarkModeAction::Off) => {
                    store.set_dark_mode(false)?;
                    false
                }
                Some(DarkModeAction::Toggle) => store.toggle_dark_mode()?,
            };
            println!("dark mode {}", if enabled { "on" } else { "off" });
        }
    }
    Ok(())
}

fn read_form(path: &Path) -> Result<SubmittedForm> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing form {}", path.display()))
}

fn export_path(dir: &Path, now: DateTime<Utc>) -> PathBuf {
    dir.join(export_file_name(now.date_naive()))
}

#[cfg(test)]
mod tests {
    use super::export_path;
    use chrono::{DateTime, Utc};
    use std::path::{Path, PathBuf};

    #[test]
    fn export_file_uses_utc_calendar_date() {
        let now: DateTime<Utc> = DateTime::parse_from_rfc3339("2024-05-01T23:30:00-02:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            export_path(Path::new("out"), now),
            PathBuf::from("out/aerosim-checklists-2024-05-02.json")
        );
    }
}
