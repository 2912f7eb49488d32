//! # Outbound Ports (Driven Ports)
//!
//! The persistence backend behind `RecordStoreService`.
//!
//! Production: `CsvTableFile`
//! Testing: `InMemoryTable`

use crate::domain::errors::StoreError;
use crate::domain::table::RecordTable;

/// Whole-table persistence.
pub trait TableStorage: Send + Sync {
    /// Read the persisted table. A missing backing file is an empty table.
    fn load(&self) -> Result<RecordTable, StoreError>;

    /// Replace the persisted table atomically.
    fn save(&mut self, table: &RecordTable) -> Result<(), StoreError>;
}
