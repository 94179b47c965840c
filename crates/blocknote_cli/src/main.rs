//! Command-line access to a note database.
//!
//! # Responsibility
//! - Open the database named by a JSON config file (in-memory without one).
//! - Print summaries, a single note, categories, or a JSON export.
//! - Keep output deterministic for scripting and quick local checks.

use blocknote_core::{
    init_from_config, open_db, open_db_in_memory, BlockKind, CoreConfig, NoteId, NoteService,
    SqliteNoteRepository, SummaryFilter,
};
use clap::{Parser, Subcommand};
use log::error;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "blocknote")]
#[command(version, about = "Inspect and transfer a block-based note database")]
struct Cli {
    /// JSON config file; without one an in-memory database is used
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
enum Command {
    /// Print core version information
    Ping,
    /// List note summaries, newest first
    List {
        /// Text or date (yyyy, yyyymm, yyyymmdd) to search for
        query: Option<String>,
    },
    /// Print one note with its blocks
    Show {
        #[arg(value_parser = parse_note_id)]
        note_id: NoteId,
    },
    /// List categories, defaults marked with `*`
    Categories,
    /// Print every note as JSON
    Export,
    /// Import notes from a JSON export
    Import { file: PathBuf },
}

fn parse_note_id(value: &str) -> Result<NoteId, String> {
    NoteId::parse_str(value).map_err(|err| format!("invalid note id `{value}`: {err}"))
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = match cli.config.as_deref() {
        Some(path) => CoreConfig::from_file(path)?,
        None => CoreConfig::default(),
    };
    init_from_config(&config)?;

    if cli.command == Command::Ping {
        println!("blocknote_core ping={}", blocknote_core::ping());
        println!("blocknote_core version={}", blocknote_core::core_version());
        return Ok(());
    }

    let mut conn = match config.database_path.as_deref() {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    let repo = SqliteNoteRepository::try_new(&mut conn)?;
    let mut service = NoteService::new(repo, config.display);

    match cli.command {
        Command::Ping => {}
        Command::List { query } => {
            let filter = query
                .as_deref()
                .map_or_else(SummaryFilter::all, SummaryFilter::smart_search);
            for summary in service.list_summaries(&filter)? {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    summary.id,
                    summary.last_modified,
                    summary.category_id,
                    summary.title,
                    summary.preview.replace('\n', " ")
                );
            }
        }
        Command::Show { note_id } => {
            let full = service.get_full_note(note_id)?;
            println!("# {}", full.note.title);
            println!(
                "id={} category={} version={} updated_at={}",
                full.note.id, full.note.category_id, full.note.version, full.note.updated_at
            );
            for block in &full.blocks {
                match block.kind() {
                    BlockKind::Text { body } => println!("[{}] text {:?}", block.order(), body),
                    BlockKind::Image {
                        file_path,
                        width_px,
                        height_px,
                        ..
                    } => println!(
                        "[{}] image {file_path} {}x{}",
                        block.order(),
                        width_px.map_or_else(|| "?".to_string(), |w| w.to_string()),
                        height_px.map_or_else(|| "?".to_string(), |h| h.to_string())
                    ),
                    BlockKind::Audio {
                        file_path,
                        duration_ms,
                        ..
                    } => println!(
                        "[{}] audio {file_path} {}ms",
                        block.order(),
                        duration_ms.map_or_else(|| "?".to_string(), |d| d.to_string())
                    ),
                }
            }
        }
        Command::Categories => {
            for category in service.list_categories()? {
                let marker = if category.is_default { "*" } else { " " };
                println!("{marker} {}\t{}", category.id, category.name);
            }
        }
        Command::Export => println!("{}", service.export_json()?),
        Command::Import { file } => {
            let json = std::fs::read_to_string(&file)?;
            let imported = service.import_json(&json)?;
            println!("imported {} notes", imported.len());
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
