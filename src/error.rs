use std::path::PathBuf;

use crate::store::StoreError;

/// Errors that abort a whole command invocation.
///
/// Per-line problems never show up here; they are collected as
/// [`ParseFailure`](crate::core::fields::ParseFailure) values instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{what} not found: {}", path.display())]
    ConfigurationMissing { what: &'static str, path: PathBuf },

    #[error("no editor configured (set $EDITOR or `editor` in the config file)")]
    NoEditor,

    #[error("invalid config file {}: {source}", path.display())]
    Config {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("`{command}` failed: {reason}")]
    Command { command: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
