use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::parser::AgendaParser;
use super::writer::mark_tasked;
use crate::error::Error;

/// Agenda files under `dir`: every non-hidden file whose name ends in `org`,
/// in file-name order.
pub fn agenda_files(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    if !dir.is_dir() {
        return Err(Error::ConfigurationMissing {
            what: "agenda directory",
            path: dir.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map_or_else(|| dir.to_path_buf(), Path::to_path_buf);
            Error::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let visible = {
            let name = entry.file_name().to_string_lossy();
            !name.starts_with('.') && name.ends_with("org")
        };
        if visible {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Shorthand lines for the `TODO` entries in one agenda file. The file is
/// left untouched.
pub fn parse_file(path: &Path) -> Result<String, Error> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Ok(AgendaParser::parse(&text))
}

/// Rewrite the `TODO` markers in `path` to `TASKED`. Returns whether the
/// file changed.
pub fn mark_file(path: &Path) -> Result<bool, Error> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let marked = mark_tasked(&text);
    if marked == text {
        return Ok(false);
    }
    std::fs::write(path, marked).map_err(|e| Error::io(path, e))?;
    Ok(true)
}

/// Convert one agenda file to shorthand lines and mark its entries as
/// tasked on disk.
pub fn convert_file(path: &Path) -> Result<String, Error> {
    let tasks = parse_file(path)?;
    if mark_file(path)? {
        log::info!("Marked {} entries tasked in {}", tasks.lines().count(), path.display());
    }
    Ok(tasks)
}

/// Convert every agenda file under `dir`, concatenating their output.
pub fn convert_directory(dir: &Path) -> Result<String, Error> {
    let mut tasks = String::new();
    for file in agenda_files(dir)? {
        tasks.push_str(&convert_file(&file)?);
    }
    Ok(tasks)
}

/// Like [`convert_directory`], without marking anything on disk.
pub fn preview_directory(dir: &Path) -> Result<String, Error> {
    let mut tasks = String::new();
    for file in agenda_files(dir)? {
        tasks.push_str(&parse_file(&file)?);
    }
    Ok(tasks)
}
