use crate::core::fields::{ParseFailure, TaskFields};
use crate::core::record::StoreRecord;
use crate::store::{StoreError, TaskStore};

/// Comment marker; lines starting with it are never ingested.
pub const COMMENT: char = '#';

/// What happened to a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Skipped,
    Created(u64),
    Updated(u64),
}

/// Result of ingesting a block of shorthand text.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    /// Records whose description had to be written a second time.
    pub repaired: usize,
    /// Lines that did not make it into the store, in input order.
    pub failures: Vec<ParseFailure>,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Reconciles shorthand lines against a task store.
///
/// A line updates the record named by its `[id]`, or failing that the record
/// carrying the same description fingerprint; only when neither exists is a
/// new record created. Store errors are caught per line and turned into
/// [`ParseFailure`]s, so one bad line never stops the batch.
pub struct IngestEngine<'s> {
    store: &'s mut dyn TaskStore,
}

impl<'s> IngestEngine<'s> {
    pub fn new(store: &'s mut dyn TaskStore) -> Self {
        Self { store }
    }

    /// Ingest every line of `text`.
    pub fn ingest_text(&mut self, text: &str) -> IngestReport {
        let mut report = IngestReport::default();

        for line in text.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            match self.ingest_line(line) {
                Ok((LineOutcome::Skipped, _)) => report.skipped += 1,
                Ok((LineOutcome::Created(_), repaired)) => {
                    report.created += 1;
                    report.repaired += usize::from(repaired);
                }
                Ok((LineOutcome::Updated(_), repaired)) => {
                    report.updated += 1;
                    report.repaired += usize::from(repaired);
                }
                Err(failure) => {
                    log::warn!("Failed to ingest \"{}\": {}", failure.line, failure.reason);
                    report.failures.push(failure);
                }
            }
        }

        log::info!(
            "Ingest complete: {} created, {} updated, {} skipped, {} failed",
            report.created,
            report.updated,
            report.skipped,
            report.failures.len(),
        );

        report
    }

    /// Ingest one line. The boolean is true when the description had to be
    /// rewritten after the first update.
    pub fn ingest_line(&mut self, line: &str) -> Result<(LineOutcome, bool), ParseFailure> {
        if line.starts_with(COMMENT) || line.trim().is_empty() {
            return Ok((LineOutcome::Skipped, false));
        }

        let fields = TaskFields::parse(line).map_err(|e| ParseFailure::new(line, e))?;
        self.reconcile(&fields)
            .map_err(|e| ParseFailure::new(line, e))
    }

    fn reconcile(&mut self, fields: &TaskFields) -> Result<(LineOutcome, bool), StoreError> {
        let existing = match fields.id {
            Some(id) => match self.store.fetch_by_id(id)? {
                Some(record) => {
                    self.check_rename(&record, fields)?;
                    Some(record)
                }
                // Ids drift as tasks complete; a stale one falls back to the fingerprint.
                None => self.store.fetch_by_fingerprint(&fields.fingerprint)?,
            },
            None => self.store.fetch_by_fingerprint(&fields.fingerprint)?,
        };

        let (mut record, outcome) = match existing {
            Some(record) => {
                log::debug!("Updating task {}: {}", record.id, fields.description);
                let id = record.id;
                (record, LineOutcome::Updated(id))
            }
            None => {
                let record = self
                    .store
                    .create(&fields.description, &fields.fingerprint)?;
                log::info!("Created task {}: {}", record.id, fields.description);
                let id = record.id;
                (record, LineOutcome::Created(id))
            }
        };

        record.description = fields.description.clone();
        record.apply_fields(fields);
        self.store.update(&record)?;

        let repaired = self.verify_description(record.id, &fields.description)?;
        Ok((outcome, repaired))
    }

    /// Refuse to rename `record` onto a description another record already
    /// carries, so a fingerprint never names two records.
    fn check_rename(
        &mut self,
        record: &StoreRecord,
        fields: &TaskFields,
    ) -> Result<(), StoreError> {
        if record.matches(&fields.fingerprint) {
            return Ok(());
        }
        match self.store.fetch_by_fingerprint(&fields.fingerprint)? {
            Some(other) if other.id != record.id => Err(StoreError::Rejected(format!(
                "Task {} already has the description \"{}\".",
                other.id, fields.description
            ))),
            _ => Ok(()),
        }
    }

    /// Re-read the record and force the description back if the store lost
    /// it on the first write. Issues at most one extra update.
    fn verify_description(&mut self, id: u64, description: &str) -> Result<bool, StoreError> {
        let mut stored = self.store.fetch_by_id(id)?.ok_or(StoreError::NotFound(id))?;
        if stored.description == description {
            return Ok(false);
        }

        log::warn!(
            "Task {} came back with description \"{}\", rewriting \"{}\"",
            id,
            stored.description,
            description
        );
        stored.description = description.to_string();
        self.store.update(&stored)?;
        Ok(true)
    }
}

/// Convenience wrapper for one-shot callers.
pub fn ingest_text(store: &mut dyn TaskStore, text: &str) -> IngestReport {
    IngestEngine::new(store).ingest_text(text)
}
