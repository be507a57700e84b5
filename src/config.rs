use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Error;

pub const APP_NAME: &str = "taskline";

fn default_editor() -> String {
    "vim".into()
}

fn default_agenda_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("pim")
}

fn default_task_binary() -> String {
    "task".into()
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    /// Editor command for the interactive buffer; may include arguments.
    pub editor: String,
    /// Directory searched recursively for agenda (`.org`) files.
    pub agenda_directory: PathBuf,
    /// Taskwarrior executable.
    pub task_binary: String,
    pub debug_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            editor: default_editor(),
            agenda_directory: default_agenda_dir(),
            task_binary: default_task_binary(),
            debug_logging: false,
        }
    }
}

impl Config {
    /// `<config dir>/taskline/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_NAME).join("config.json"))
    }

    /// Load the config file if there is one, then apply environment
    /// overrides. A missing file is not an error; a malformed one is.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let path = path.map(Path::to_path_buf).or_else(Self::default_path);
        let mut config = match path {
            Some(ref p) if p.is_file() => Self::from_file(p)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&text).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `EDITOR`, `TASKLINE_AGENDA_DIR` and `TASKLINE_TASK_BIN` win over the
    /// file. Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(editor) = get("EDITOR") {
            self.editor = editor;
        }
        if let Some(dir) = get("TASKLINE_AGENDA_DIR") {
            self.agenda_directory = PathBuf::from(dir);
        }
        if let Some(bin) = get("TASKLINE_TASK_BIN") {
            self.task_binary = bin;
        }
    }
}
