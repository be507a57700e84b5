use std::io::Write;
use std::process::Command;

use crate::error::Error;

/// Something that lets a person edit a text buffer and hands it back.
pub trait Editor {
    fn edit(&mut self, buffer: &str) -> Result<String, Error>;
}

/// Opens the buffer in an external editor (`$EDITOR`) on a temporary file
/// and waits for it to exit.
#[derive(Debug, Clone)]
pub struct ExternalEditor {
    command: String,
}

impl ExternalEditor {
    /// `command` may carry arguments, e.g. `code --wait`.
    pub fn new(command: impl Into<String>) -> Result<Self, Error> {
        let command = command.into();
        if command.trim().is_empty() {
            return Err(Error::NoEditor);
        }
        Ok(Self { command })
    }
}

impl Editor for ExternalEditor {
    fn edit(&mut self, buffer: &str) -> Result<String, Error> {
        let mut file = tempfile::Builder::new()
            .prefix("taskline-")
            .suffix(".tmp")
            .tempfile()
            .map_err(|e| Error::io(std::env::temp_dir(), e))?;
        if let Err(e) = file.write_all(buffer.as_bytes()).and_then(|()| file.flush()) {
            return Err(Error::io(file.path(), e));
        }

        let mut parts = self.command.split_whitespace();
        let program = parts.next().ok_or(Error::NoEditor)?;

        log::debug!("Opening {} in {}", file.path().display(), self.command);
        let status = Command::new(program)
            .args(parts)
            .arg(file.path())
            .status()
            .map_err(|e| Error::Command {
                command: self.command.clone(),
                reason: e.to_string(),
            })?;

        if !status.success() {
            return Err(Error::Command {
                command: self.command.clone(),
                reason: format!("exited with {}", status),
            });
        }

        // Editors often replace the file rather than write into it, so read
        // back by path instead of through the open handle.
        std::fs::read_to_string(file.path()).map_err(|e| Error::io(file.path(), e))
    }
}
