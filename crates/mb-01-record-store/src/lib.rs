//! # Record Store (mb-01)
//!
//! The authoritative owner of user record state. Every other component reads
//! and writes records through `RecordStoreApi`; nothing else opens the file.
//!
//! ## Persisted Layout
//!
//! ```text
//! matcherUuid,contactFrequencyOption,...,duplicationList   <- request header
//! u7,weekly,F,football,TRUE,20-25,ENFP,cs,24,u3            <- current request slot
//! uuid,age,contactFrequency,gender,hobby,major,mbti,duplication   <- record header
//! u1,24,weekly,M,chess,math,INTJ,FALSE                     <- one row per record
//! ```
//!
//! The column order is a contract with the external scorer, which reads the
//! same file.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Unique Subject | `uuid` is unique across live records |
//! | 2 | Durable Before Ack | A mutation returns `Ok` only after the file is replaced |
//! | 3 | Atomic Replace | Writes go through temp file + fsync + rename |
//! | 4 | Single Writer | One process (file lock) and one caller (mutex) at a time |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Records, preferences, the in-memory table, errors
//! - `ports/` - `RecordStoreApi` (inbound), `TableStorage` (outbound)
//! - `adapters/` - CSV file storage, in-memory storage, process lock
//! - `service.rs` - `RecordStoreService`, the serialized implementation
//!
//! ## Usage
//!
//! ```ignore
//! use mb_01_record_store::{RecordStoreApi, RecordStoreService};
//!
//! let store = RecordStoreService::open_csv("data/users.csv")?;
//! store.create(record)?;
//! let all = store.list()?;
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export key types for convenience
pub use adapters::lock::{LockError, StoreLock};
pub use adapters::storage::{CsvTableFile, InMemoryTable};
pub use domain::entities::{
    MatchPreferences, Record, RecordFields, SubjectId, PREFERENCE_COLUMNS, RECORD_COLUMNS,
};
pub use domain::errors::StoreError;
pub use domain::table::RecordTable;
pub use ports::inbound::RecordStoreApi;
pub use ports::outbound::TableStorage;
pub use service::RecordStoreService;
