//! # Record Store Service
//!
//! Implements `RecordStoreApi` over any `TableStorage`.
//!
//! All calls take one mutex, so operations from concurrent consumers are
//! serialized. A mutation is applied to a copy of the table, saved, and only
//! then committed; a failed save leaves both memory and disk unchanged.

use crate::adapters::storage::{CsvTableFile, InMemoryTable};
use crate::domain::entities::{MatchPreferences, Record, RecordFields, SubjectId};
use crate::domain::errors::StoreError;
use crate::domain::table::RecordTable;
use crate::ports::inbound::RecordStoreApi;
use crate::ports::outbound::TableStorage;
use parking_lot::Mutex;
use std::path::Path;
use tracing::{debug, warn};

struct Inner<S> {
    storage: S,
    table: RecordTable,
}

/// The Record Store Service.
pub struct RecordStoreService<S: TableStorage> {
    inner: Mutex<Inner<S>>,
}

impl<S: TableStorage> RecordStoreService<S> {
    /// Load the table from `storage` and take ownership of it.
    pub fn open(storage: S) -> Result<Self, StoreError> {
        let table = storage.load()?;
        Ok(Self {
            inner: Mutex::new(Inner { storage, table }),
        })
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.inner.lock().table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply `change` to a copy of the table, persist it, then commit.
    fn mutate<T>(
        &self,
        op: &'static str,
        change: impl FnOnce(&mut RecordTable) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut inner = self.inner.lock();
        let mut next = inner.table.clone();
        let out = change(&mut next)?;

        if let Err(e) = inner.storage.save(&next) {
            warn!(op, error = %e, "Store write failed, change discarded");
            return Err(e);
        }
        inner.table = next;
        debug!(op, records = inner.table.len(), "Store change committed");
        Ok(out)
    }
}

impl RecordStoreService<InMemoryTable> {
    /// A volatile store.
    pub fn in_memory() -> Self {
        Self {
            inner: Mutex::new(Inner {
                storage: InMemoryTable::new(),
                table: RecordTable::default(),
            }),
        }
    }
}

impl RecordStoreService<CsvTableFile> {
    /// The production store: a locked CSV file.
    pub fn open_csv<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::open(CsvTableFile::open(path)?)
    }
}

impl<S: TableStorage> RecordStoreApi for RecordStoreService<S> {
    fn create(&self, record: Record) -> Result<Record, StoreError> {
        self.mutate("create", |table| {
            table.insert(record.clone())?;
            Ok(record)
        })
    }

    fn get(&self, id: &SubjectId) -> Result<Record, StoreError> {
        self.inner
            .lock()
            .table
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn update(&self, id: &SubjectId, fields: RecordFields) -> Result<Record, StoreError> {
        self.mutate("update", |table| table.update(id, fields))
    }

    fn delete(&self, id: &SubjectId) -> Result<Record, StoreError> {
        self.mutate("delete", |table| table.remove(id))
    }

    fn list(&self) -> Result<Vec<Record>, StoreError> {
        Ok(self.inner.lock().table.records().to_vec())
    }

    fn write_preferences(&self, preferences: MatchPreferences) -> Result<(), StoreError> {
        self.mutate("write_preferences", |table| {
            table.set_preferences(preferences);
            Ok(())
        })
    }

    fn read_preferences(&self) -> Result<Option<MatchPreferences>, StoreError> {
        Ok(self.inner.lock().table.preferences().cloned())
    }
}
