use chrono::Utc;
use std::io::Write;
use std::process::{Command, Stdio};
use uuid::Uuid;

use super::{StoreError, TaskStore};
use crate::core::fingerprint::Fingerprint;
use crate::core::record::{FINGERPRINT_KEY, StoreRecord};

/// Overrides passed on every invocation: no prompts, no chatter, and the
/// fingerprint declared as a UDA so it survives import and can be filtered on.
const RC_OVERRIDES: &[&str] = &[
    "rc.confirmation=no",
    "rc.verbose=nothing",
    "rc.bulk=0",
    "rc.uda.twi_hash.type=string",
    "rc.uda.twi_hash.label=Hash",
];

/// Store backed by the Taskwarrior `task` command line.
///
/// Reads go through `task <filter> export`, writes through `task import`
/// (which creates or modifies by uuid). Errors carry the last line Taskwarrior
/// printed on stderr.
#[derive(Debug, Clone)]
pub struct TaskwarriorStore {
    binary: String,
}

impl TaskwarriorStore {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run(&self, args: &[&str], input: Option<&str>) -> Result<String, StoreError> {
        let command = format!("{} {}", self.binary, args.join(" "));
        log::debug!("Running {}", command);

        let spawn_err = |source: std::io::Error| StoreError::Spawn {
            command: command.clone(),
            source,
        };

        let mut child = Command::new(&self.binary)
            .args(RC_OVERRIDES)
            .args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
            stdin.write_all(input.as_bytes()).map_err(spawn_err)?;
        }

        let output = child.wait_with_output().map_err(spawn_err)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = last_error_line(&stderr)
                .unwrap_or_else(|| format!("`{}` exited with {}", command, output.status));
            return Err(StoreError::Rejected(message));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn export(&self, filter: &[&str]) -> Result<Vec<StoreRecord>, StoreError> {
        let mut args = filter.to_vec();
        args.push("export");
        decode_export(&self.run(&args, None)?)
    }

    fn import(&self, record: &StoreRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(&[record])?;
        self.run(&["import", "-"], Some(&json))?;
        Ok(())
    }
}

impl TaskStore for TaskwarriorStore {
    fn create(
        &mut self,
        description: &str,
        fingerprint: &Fingerprint,
    ) -> Result<StoreRecord, StoreError> {
        let uuid = Uuid::new_v4().to_string();

        let mut record = StoreRecord::new(0, description);
        record.set("uuid", uuid.clone());
        record.set("status", "pending");
        record.set("entry", Utc::now().format("%Y%m%dT%H%M%SZ").to_string());
        record.set(FINGERPRINT_KEY, fingerprint.as_str());
        self.import(&record)?;

        // Read it back for the working-set id Taskwarrior assigned.
        self.export(&[format!("uuid:{}", uuid).as_str()])?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Rejected(format!("task {} was not created", uuid)))
    }

    fn fetch_by_id(&mut self, id: u64) -> Result<Option<StoreRecord>, StoreError> {
        Ok(self.export(&[id.to_string().as_str()])?.into_iter().next())
    }

    fn fetch_by_fingerprint(
        &mut self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<StoreRecord>, StoreError> {
        let filter = format!("{}:{}", FINGERPRINT_KEY, fingerprint);
        Ok(self
            .export(&["status:pending", filter.as_str()])?
            .into_iter()
            .next())
    }

    fn update(&mut self, record: &StoreRecord) -> Result<(), StoreError> {
        if record.uuid().is_none() {
            return Err(StoreError::Rejected(format!(
                "task {} has no uuid",
                record.id
            )));
        }
        self.import(record)
    }

    fn delete(&mut self, id: u64) -> Result<(), StoreError> {
        self.run(&[id.to_string().as_str(), "delete"], None)?;
        Ok(())
    }
}

/// Decode `task export` output.
///
/// Current Taskwarrior prints one JSON array; older releases print one
/// object per line, comma-terminated.
fn decode_export(stdout: &str) -> Result<Vec<StoreRecord>, StoreError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }

    let mut records = Vec::new();
    for line in trimmed.lines() {
        let line = line.trim().trim_end_matches(',');
        if line.is_empty() {
            continue;
        }
        records.push(serde_json::from_str(line)?);
    }
    Ok(records)
}

/// The last non-empty stderr line, which is where Taskwarrior puts its
/// actual complaint.
fn last_error_line(stderr: &str) -> Option<String> {
    stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_array_export() {
        let out = r#"[
{"id":1,"description":"Buy milk","status":"pending","uuid":"a"},
{"id":2,"description":"Pay rent","status":"pending","uuid":"b","tags":["home"]}
]
"#;
        let records = decode_export(out).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].description, "Pay rent");
        assert!(records[1].has_tag("home"));
    }

    #[test]
    fn decode_line_export() {
        let out = "{\"id\":1,\"description\":\"Buy milk\",\"uuid\":\"a\"},\n\
                   {\"id\":2,\"description\":\"Pay rent\",\"uuid\":\"b\"}\n";
        let records = decode_export(out).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].uuid(), Some("a"));
    }

    #[test]
    fn decode_empty_export() {
        assert!(decode_export("\n").unwrap().is_empty());
        assert!(decode_export("[]").unwrap().is_empty());
    }

    #[test]
    fn decode_garbage_is_an_error() {
        assert!(matches!(
            decode_export("Configuration override"),
            Err(StoreError::Decode(_))
        ));
    }

    #[test]
    fn error_line_is_last_nonempty() {
        let stderr = "Configuration override rc.bulk=0\n\
                      'tomorrowish' is not a valid date in the 'Y-M-D' format.\n\n";
        assert_eq!(
            last_error_line(stderr).as_deref(),
            Some("'tomorrowish' is not a valid date in the 'Y-M-D' format.")
        );
        assert_eq!(last_error_line("  \n"), None);
    }

    #[test]
    fn update_without_uuid_is_rejected() {
        let mut store = TaskwarriorStore::new("task");
        let record = StoreRecord::new(3, "Pay rent");
        assert!(matches!(store.update(&record), Err(StoreError::Rejected(_))));
    }

    #[test]
    fn missing_binary_reports_spawn_error() {
        let mut store = TaskwarriorStore::new("/nonexistent/taskline-test/task");
        let err = store.fetch_by_id(1).unwrap_err();
        assert!(matches!(err, StoreError::Spawn { .. }));
    }
}
