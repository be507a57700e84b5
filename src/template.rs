use regex::Regex;
use std::path::Path;
use std::process::Command;
use std::sync::LazyLock;

use crate::error::Error;

/// Per-repository template file; its first line is the shorthand template.
pub const TEMPLATE_FILE: &str = ".twparse";

/// Replaced with the text following each `TODO:` comment.
pub const PLACEHOLDER: &str = "$TODO";

/// Marker searched for across tracked files.
pub const MARKER: &str = "TODO:";

static TODO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+TODO:\s(?P<task>.+)").unwrap());

/// Finds every tracked line containing a marker.
pub trait TextSearch {
    /// Raw search output, one hit per line.
    fn search(&self, dir: &Path, marker: &str) -> Result<String, Error>;
}

/// Searches with `git grep`, so only tracked files are scanned.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitGrep;

impl TextSearch for GitGrep {
    fn search(&self, dir: &Path, marker: &str) -> Result<String, Error> {
        let command = format!("git grep {}", marker);
        let output = Command::new("git")
            .args(["grep", marker])
            .current_dir(dir)
            .output()
            .map_err(|e| Error::Command {
                command: command.clone(),
                reason: e.to_string(),
            })?;

        // git grep exits 1 when nothing matched.
        match output.status.code() {
            Some(0) | Some(1) => Ok(String::from_utf8_lossy(&output.stdout).into_owned()),
            _ => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(Error::Command {
                    command,
                    reason: stderr.trim().to_string(),
                })
            }
        }
    }
}

/// Read the template line from `dir`. The line always ends with `\n`.
pub fn load_template(dir: &Path) -> Result<String, Error> {
    let path = dir.join(TEMPLATE_FILE);
    if !path.is_file() {
        return Err(Error::ConfigurationMissing {
            what: "template file",
            path,
        });
    }

    let text = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
    let line = text.lines().next().unwrap_or_default();
    if !line.contains(PLACEHOLDER) {
        log::warn!("{} has no {} placeholder", path.display(), PLACEHOLDER);
    }
    Ok(format!("{}\n", line))
}

/// Substitute every `TODO:` hit in `hits` into `template`. Lines without a
/// `TODO: text` comment are skipped.
pub fn expand(template: &str, hits: &str) -> String {
    let mut out = String::new();
    for line in hits.lines() {
        if let Some(caps) = TODO_RE.captures(line) {
            out.push_str(&template.replace(PLACEHOLDER, &caps["task"]));
        }
    }
    out
}

/// Produce shorthand lines for every `TODO:` comment tracked in `dir`.
pub fn scan_repository(dir: &Path, search: &dyn TextSearch) -> Result<String, Error> {
    let template = load_template(dir)?;
    let hits = search.search(dir, MARKER)?;
    let tasks = expand(&template, &hits);
    log::info!(
        "Found {} TODO comments in {}",
        tasks.lines().count(),
        dir.display()
    );
    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSearch(&'static str);

    impl TextSearch for FixedSearch {
        fn search(&self, _dir: &Path, marker: &str) -> Result<String, Error> {
            assert_eq!(marker, MARKER);
            Ok(self.0.to_string())
        }
    }

    const HITS: &str = "\
src/main.rs:    // TODO: handle resize events
src/lib.rs:fn x() {} // TODO: remove this
README.md:TODO: no leading whitespace
src/store.rs:    // TODO:
";

    #[test]
    fn expand_substitutes_each_hit() {
        let out = expand("(M) $TODO +taskline @code\n", HITS);
        assert_eq!(
            out,
            "(M) handle resize events +taskline @code\n(M) remove this +taskline @code\n"
        );
    }

    #[test]
    fn scan_repository_uses_template_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(TEMPLATE_FILE), "(L) $TODO +repo\nignored second line\n")
            .unwrap();

        let out = scan_repository(dir.path(), &FixedSearch(HITS)).unwrap();
        assert_eq!(out, "(L) handle resize events +repo\n(L) remove this +repo\n");
    }

    #[test]
    fn template_without_newline_gets_one() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(TEMPLATE_FILE), "$TODO @code").unwrap();
        assert_eq!(load_template(dir.path()).unwrap(), "$TODO @code\n");
    }

    #[test]
    fn missing_template_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan_repository(dir.path(), &FixedSearch(HITS)).unwrap_err();
        assert!(matches!(
            err,
            Error::ConfigurationMissing { what: "template file", .. }
        ));
    }
}
