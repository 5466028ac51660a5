//! Journal Module - the store the watcher reads from

pub mod entry;
pub mod store;

pub use entry::{FeatureRecord, JournalEntry};
pub use store::{JournalStore, PgJournalStore, StoreError};
