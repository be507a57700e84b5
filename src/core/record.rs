use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::fields::TaskFields;
use super::fingerprint::Fingerprint;

/// Attribute under which the description fingerprint is stored.
pub const FINGERPRINT_KEY: &str = "twi_hash";

/// Attribute keys a shorthand `key:value` token may never overwrite.
const RESERVED_KEYS: &[&str] = &["id", "uuid", "description", "tags", "entry", FINGERPRINT_KEY];

/// A task as the store sees it.
///
/// Only the id, description and tags are typed; everything else (priority,
/// project, due, scheduled, uuid, custom fields) lives in the open attribute
/// map, which lines up with a Taskwarrior JSON export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    #[serde(default, skip_serializing_if = "is_unassigned")]
    pub id: u64,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

fn is_unassigned(id: &u64) -> bool {
    *id == 0
}

impl StoreRecord {
    pub fn new(id: u64, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            tags: Vec::new(),
            attributes: Map::new(),
        }
    }

    /// String value of an attribute, if it is set and is a string.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes
            .insert(key.into(), Value::String(value.into()));
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.get(FINGERPRINT_KEY)
    }

    pub fn uuid(&self) -> Option<&str> {
        self.get("uuid")
    }

    pub fn project(&self) -> Option<&str> {
        self.get("project")
    }

    pub fn priority(&self) -> Option<&str> {
        self.get("priority")
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Overlay the fields captured from a shorthand line.
    ///
    /// Free-form attributes go first so an explicit `(priority)` or
    /// `+project` token always beats a `priority:`/`project:` attribute.
    /// Tags replace the stored set only when the line carried any.
    pub fn apply_fields(&mut self, fields: &TaskFields) {
        for (key, value) in &fields.attributes {
            if RESERVED_KEYS.contains(&key.as_str()) {
                log::debug!("Ignoring reserved attribute `{}` on \"{}\"", key, fields.description);
                continue;
            }
            self.set(key.clone(), value.clone());
        }
        if let Some(ref priority) = fields.priority {
            self.set("priority", priority.clone());
        }
        if let Some(ref project) = fields.project {
            self.set("project", project.clone());
        }
        if !fields.tags.is_empty() {
            self.tags = fields.tags.clone();
        }
        self.set(FINGERPRINT_KEY, fields.fingerprint.as_str());
    }

    /// True when this record was stored under the given fingerprint.
    pub fn matches(&self, fingerprint: &Fingerprint) -> bool {
        self.fingerprint() == Some(fingerprint.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_fields_sets_typed_values() {
        let fields = TaskFields::parse("(H) Write report +work @home @urgent due:2024-01-01").unwrap();
        let mut record = StoreRecord::new(3, "Write report");
        record.apply_fields(&fields);

        assert_eq!(record.priority(), Some("H"));
        assert_eq!(record.project(), Some("work"));
        assert_eq!(record.tags, vec!["home", "urgent"]);
        assert_eq!(record.get("due"), Some("2024-01-01"));
        assert!(record.matches(&fields.fingerprint));
    }

    #[test]
    fn explicit_tokens_beat_attributes() {
        let fields = TaskFields::parse("(U) Pay rent priority:L project:misc +home").unwrap();
        let mut record = StoreRecord::new(1, "Pay rent");
        record.apply_fields(&fields);
        assert_eq!(record.priority(), Some("U"));
        assert_eq!(record.project(), Some("home"));
    }

    #[test]
    fn reserved_attributes_are_ignored() {
        let fields = TaskFields::parse("Pay rent uuid:abc description:oops").unwrap();
        let mut record = StoreRecord::new(1, "Pay rent");
        record.set("uuid", "real");
        record.apply_fields(&fields);
        assert_eq!(record.uuid(), Some("real"));
        assert_eq!(record.description, "Pay rent");
    }

    #[test]
    fn tags_kept_when_line_has_none() {
        let fields = TaskFields::parse("Pay rent").unwrap();
        let mut record = StoreRecord::new(1, "Pay rent");
        record.tags = vec!["home".to_string()];
        record.apply_fields(&fields);
        assert!(record.has_tag("home"));
    }

    #[test]
    fn deserializes_taskwarrior_export() {
        let json = r#"{"id":4,"description":"Buy milk","entry":"20240101T120000Z",
            "status":"pending","tags":["errand"],"twi_hash":"abc","urgency":1.8,
            "uuid":"0b7c3a6e-2d0e-4b4e-9d4a-5f1c4c1b2a11"}"#;
        let record: StoreRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, 4);
        assert_eq!(record.description, "Buy milk");
        assert_eq!(record.tags, vec!["errand"]);
        assert_eq!(record.fingerprint(), Some("abc"));
        assert_eq!(record.get("status"), Some("pending"));
        assert_eq!(record.get("urgency"), None);
        assert!(record.attributes.contains_key("urgency"));
    }
}
