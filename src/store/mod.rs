pub mod memory;
pub mod taskwarrior;

use crate::core::fingerprint::Fingerprint;
use crate::core::record::StoreRecord;

pub use memory::MemoryStore;
pub use taskwarrior::TaskwarriorStore;

/// A store operation that did not go through.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store refused the operation; the message is the store's own.
    #[error("{0}")]
    Rejected(String),

    #[error("no task with id {0}")]
    NotFound(u64),

    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("unreadable store output: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The system of record for tasks.
///
/// Every engine operation receives the store explicitly, so tests can swap
/// in a [`MemoryStore`]. Calls are blocking and never retried here.
pub trait TaskStore {
    /// Create a record holding only a description and its fingerprint.
    fn create(
        &mut self,
        description: &str,
        fingerprint: &Fingerprint,
    ) -> Result<StoreRecord, StoreError>;

    fn fetch_by_id(&mut self, id: u64) -> Result<Option<StoreRecord>, StoreError>;

    fn fetch_by_fingerprint(
        &mut self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<StoreRecord>, StoreError>;

    /// Write every field of `record` back to the store.
    fn update(&mut self, record: &StoreRecord) -> Result<(), StoreError>;

    fn delete(&mut self, id: u64) -> Result<(), StoreError>;
}
