pub mod config;
pub mod core;
pub mod editor;
pub mod error;
pub mod ingest;
pub mod org;
pub mod retry;
pub mod store;
pub mod template;

pub use crate::core::fields::{FieldError, ParseFailure, TaskFields};
pub use crate::core::fingerprint::Fingerprint;
pub use crate::core::record::StoreRecord;
pub use error::Error;
pub use ingest::{IngestEngine, IngestReport, ingest_text};
pub use store::{MemoryStore, StoreError, TaskStore, TaskwarriorStore};

use std::sync::atomic::{AtomicBool, Ordering};

/// Whether debug logging is active, shared between the logger filter and the config/CLI toggle.
static DEBUG_LOGGING: AtomicBool = AtomicBool::new(false);

pub fn set_debug_logging(enabled: bool) {
    DEBUG_LOGGING.store(enabled, Ordering::Relaxed);
}

pub fn debug_logging() -> bool {
    DEBUG_LOGGING.load(Ordering::Relaxed)
}
