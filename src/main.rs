use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use taskline::config::{APP_NAME, Config};
use taskline::editor::ExternalEditor;
use taskline::error::Error;
use taskline::store::{MemoryStore, TaskStore, TaskwarriorStore};
use taskline::template::{GitGrep, scan_repository};
use taskline::{ingest, org, retry};

#[derive(Debug, Parser)]
#[command(name = APP_NAME, version, about = "Turn shorthand lines, org agendas and TODO comments into Taskwarrior tasks")]
struct Cli {
    /// Log at debug level.
    #[arg(long, global = true)]
    debug: bool,

    /// Ingest into a throwaway in-memory store instead of Taskwarrior and
    /// leave agenda files unmarked.
    #[arg(long, global = true)]
    dry_run: bool,

    /// Config file (default: <config dir>/taskline/config.json).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Type tasks into the editor; failed lines come back until they all go in.
    Edit,
    /// Ingest TODO entries from agenda (.org) files and mark them TASKED.
    Agenda {
        /// Agenda directory (default: the configured one).
        dir: Option<PathBuf>,
        /// Reopen failed lines in the editor.
        #[arg(long)]
        retry: bool,
    },
    /// Ingest `TODO:` comments tracked in a git repository via its .twparse template.
    Git {
        #[arg(default_value = ".")]
        dir: PathBuf,
        #[arg(long)]
        retry: bool,
    },
    /// Ingest shorthand lines from a file, or stdin when no file is given.
    Import {
        file: Option<PathBuf>,
        #[arg(long)]
        retry: bool,
    },
    /// Delete a task by id.
    Delete { id: u64 },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", APP_NAME, e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(cli.debug || config.debug_logging);

    match run(cli, &config) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("{}: {}", APP_NAME, e);
            ExitCode::FAILURE
        }
    }
}

/// Log to the systemd user journal (`journalctl --user -t taskline -f`).
/// taskline targets pass at info/debug (per config), everything else at warn.
/// Without a reachable journal the process runs with logging off.
fn init_logging(debug: bool) {
    struct FilteredJournal {
        inner: systemd_journal_logger::JournalLog,
    }

    impl log::Log for FilteredJournal {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            if metadata.target().starts_with(APP_NAME) {
                let max = if taskline::debug_logging() {
                    log::LevelFilter::Debug
                } else {
                    log::LevelFilter::Info
                };
                metadata.level() <= max
            } else {
                metadata.level() <= log::LevelFilter::Warn
            }
        }
        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                self.inner.log(record);
            }
        }
        fn flush(&self) {
            self.inner.flush();
        }
    }

    taskline::set_debug_logging(debug);

    let Ok(journal) = systemd_journal_logger::JournalLog::new() else {
        return;
    };
    let journal = journal.with_syslog_identifier(APP_NAME.to_string());
    if log::set_boxed_logger(Box::new(FilteredJournal { inner: journal })).is_ok() {
        // Global max must be Debug so debug logs can pass through when toggled
        log::set_max_level(log::LevelFilter::Debug);
    }
}

fn run(cli: Cli, config: &Config) -> Result<ExitCode, Error> {
    let dry_run = cli.dry_run;
    let mut store: Box<dyn TaskStore> = if dry_run {
        Box::new(MemoryStore::new())
    } else {
        Box::new(TaskwarriorStore::new(config.task_binary.clone()))
    };
    let header = retry::header(APP_NAME, env!("CARGO_PKG_VERSION"));

    match cli.command.unwrap_or(Command::Edit) {
        Command::Edit => {
            let mut editor = ExternalEditor::new(config.editor.clone())?;
            let summary = retry::run(store.as_mut(), &mut editor, &header, Vec::new())?;
            println!("{} created, {} updated", summary.created, summary.updated);
            Ok(ExitCode::SUCCESS)
        }
        Command::Agenda { dir, retry } => {
            let editor = retry_editor(config, retry)?;
            let dir = dir.unwrap_or_else(|| config.agenda_directory.clone());
            // A dry run goes into a throwaway store, so the files keep their TODOs.
            let text = if dry_run {
                org::convert::preview_directory(&dir)?
            } else {
                org::convert::convert_directory(&dir)?
            };
            ingest_once(store.as_mut(), editor, &header, &text)
        }
        Command::Git { dir, retry } => {
            let editor = retry_editor(config, retry)?;
            let text = scan_repository(&dir, &GitGrep)?;
            ingest_once(store.as_mut(), editor, &header, &text)
        }
        Command::Import { file, retry } => {
            let editor = retry_editor(config, retry)?;
            let text = read_input(file.as_deref())?;
            ingest_once(store.as_mut(), editor, &header, &text)
        }
        Command::Delete { id } => {
            store.delete(id)?;
            println!("Deleted task {}", id);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Resolve the editor up front so a bad editor setting fails before the
/// store is touched.
fn retry_editor(config: &Config, retry: bool) -> Result<Option<ExternalEditor>, Error> {
    if retry {
        ExternalEditor::new(config.editor.clone()).map(Some)
    } else {
        Ok(None)
    }
}

fn read_input(file: Option<&Path>) -> Result<String, Error> {
    match file {
        Some(path) => std::fs::read_to_string(path).map_err(|e| Error::Io {
            path: path.to_path_buf(),
            source: e,
        }),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| Error::Io {
                    path: PathBuf::from("<stdin>"),
                    source: e,
                })?;
            Ok(text)
        }
    }
}

/// One ingest pass. Failures either go to the retry loop or are printed,
/// in which case the exit status is non-zero.
fn ingest_once(
    store: &mut dyn TaskStore,
    editor: Option<ExternalEditor>,
    header: &str,
    text: &str,
) -> Result<ExitCode, Error> {
    let report = ingest::ingest_text(store, text);
    println!("{} created, {} updated", report.created, report.updated);

    if report.is_clean() {
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(mut editor) = editor {
        let summary = retry::run(store, &mut editor, header, report.failures)?;
        println!("{} created, {} updated on retry", summary.created, summary.updated);
        return Ok(ExitCode::SUCCESS);
    }

    for failure in &report.failures {
        eprintln!("{}\n    ERROR: {}", failure.line, failure.reason);
    }
    Ok(ExitCode::FAILURE)
}
