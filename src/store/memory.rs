use chrono::{NaiveDate, NaiveDateTime, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{StoreError, TaskStore};
use crate::core::fingerprint::Fingerprint;
use crate::core::record::StoreRecord;

/// Attributes the store parses as dates.
const DATE_KEYS: &[&str] = &["due", "scheduled", "wait", "until"];

/// In-process task store.
///
/// Backs `--dry-run` and the tests. It validates dates and (optionally)
/// priorities the way Taskwarrior does, and can be told to lose the
/// description on upcoming updates to reproduce description drift.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<u64, StoreRecord>,
    next_id: u64,
    priorities: Option<Vec<String>>,
    drop_descriptions: usize,
    updates: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept these priority codes on update.
    pub fn with_priorities(mut self, codes: &[&str]) -> Self {
        self.priorities = Some(codes.iter().map(|c| c.to_string()).collect());
        self
    }

    /// The next `count` updates store an empty description.
    pub fn drop_descriptions(&mut self, count: usize) {
        self.drop_descriptions = count;
    }

    /// Number of updates accepted so far.
    pub fn update_count(&self) -> usize {
        self.updates
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &StoreRecord> {
        self.records.values()
    }

    fn validate(&self, record: &StoreRecord) -> Result<(), StoreError> {
        for key in DATE_KEYS {
            if let Some(value) = record.get(key) {
                if !is_date(value) {
                    return Err(StoreError::Rejected(format!(
                        "'{}' is not a valid date in the 'Y-M-D' format.",
                        value
                    )));
                }
            }
        }
        if let (Some(allowed), Some(priority)) = (&self.priorities, record.priority()) {
            if !allowed.iter().any(|p| p == priority) {
                return Err(StoreError::Rejected(format!(
                    "The 'priority' attribute does not allow a value of '{}'.",
                    priority
                )));
            }
        }
        Ok(())
    }
}

fn is_date(value: &str) -> bool {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%SZ").is_ok()
}

impl TaskStore for MemoryStore {
    fn create(
        &mut self,
        description: &str,
        fingerprint: &Fingerprint,
    ) -> Result<StoreRecord, StoreError> {
        if description.trim().is_empty() {
            return Err(StoreError::Rejected(
                "Additional text must be provided.".to_string(),
            ));
        }

        self.next_id += 1;
        let mut record = StoreRecord::new(self.next_id, description);
        record.set("uuid", Uuid::new_v4().to_string());
        record.set("status", "pending");
        record.set("entry", Utc::now().format("%Y%m%dT%H%M%SZ").to_string());
        record.set(crate::core::record::FINGERPRINT_KEY, fingerprint.as_str());

        self.records.insert(record.id, record.clone());
        Ok(record)
    }

    fn fetch_by_id(&mut self, id: u64) -> Result<Option<StoreRecord>, StoreError> {
        Ok(self.records.get(&id).cloned())
    }

    fn fetch_by_fingerprint(
        &mut self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<StoreRecord>, StoreError> {
        Ok(self
            .records
            .values()
            .find(|r| r.matches(fingerprint))
            .cloned())
    }

    fn update(&mut self, record: &StoreRecord) -> Result<(), StoreError> {
        if !self.records.contains_key(&record.id) {
            return Err(StoreError::NotFound(record.id));
        }
        self.validate(record)?;

        let mut stored = record.clone();
        if self.drop_descriptions > 0 {
            self.drop_descriptions -= 1;
            stored.description.clear();
        }
        self.records.insert(stored.id, stored);
        self.updates += 1;
        Ok(())
    }

    fn delete(&mut self, id: u64) -> Result<(), StoreError> {
        self.records
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_assigns_ids_and_fingerprint() {
        let mut store = MemoryStore::new();
        let fp = Fingerprint::of("Buy milk");
        let a = store.create("Buy milk", &fp).unwrap();
        let b = store.create("Buy eggs", &Fingerprint::of("Buy eggs")).unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert!(a.uuid().is_some());
        assert_eq!(
            store.fetch_by_fingerprint(&fp).unwrap().map(|r| r.id),
            Some(1)
        );
    }

    #[test]
    fn create_rejects_blank_description() {
        let mut store = MemoryStore::new();
        let err = store.create("  ", &Fingerprint::of("")).unwrap_err();
        assert_eq!(err.to_string(), "Additional text must be provided.");
    }

    #[test]
    fn update_rejects_bad_dates() {
        let mut store = MemoryStore::new();
        let mut record = store.create("Pay bills", &Fingerprint::of("Pay bills")).unwrap();
        record.set("due", "someday");
        let err = store.update(&record).unwrap_err();
        assert_eq!(
            err.to_string(),
            "'someday' is not a valid date in the 'Y-M-D' format."
        );

        record.set("due", "2024-03-01T09:30");
        store.update(&record).unwrap();
        assert_eq!(store.update_count(), 1);
    }

    #[test]
    fn update_checks_priorities_when_configured() {
        let mut store = MemoryStore::new().with_priorities(&["H", "M", "L"]);
        let mut record = store.create("Pay bills", &Fingerprint::of("Pay bills")).unwrap();
        record.set("priority", "Q");
        assert!(store.update(&record).is_err());
        record.set("priority", "H");
        assert!(store.update(&record).is_ok());
    }

    #[test]
    fn dropped_description_is_visible_on_fetch() {
        let mut store = MemoryStore::new();
        let record = store.create("Pay bills", &Fingerprint::of("Pay bills")).unwrap();
        store.drop_descriptions(1);
        store.update(&record).unwrap();
        assert_eq!(store.fetch_by_id(record.id).unwrap().unwrap().description, "");
        store.update(&record).unwrap();
        assert_eq!(
            store.fetch_by_id(record.id).unwrap().unwrap().description,
            "Pay bills"
        );
    }

    #[test]
    fn delete_removes_record() {
        let mut store = MemoryStore::new();
        let record = store.create("Pay bills", &Fingerprint::of("Pay bills")).unwrap();
        store.delete(record.id).unwrap();
        assert!(store.is_empty());
        assert!(matches!(store.delete(record.id), Err(StoreError::NotFound(1))));
    }
}
