//! # Inbound Ports (Driving Ports)
//!
//! The API offered to the bridge. Calls are blocking; async callers should
//! run them on the blocking pool.

use crate::domain::entities::{MatchPreferences, Record, RecordFields, SubjectId};
use crate::domain::errors::StoreError;

/// Record store operations.
///
/// Every mutating call has durably persisted its effect when it returns `Ok`,
/// so a following `get`/`list` observes it.
pub trait RecordStoreApi: Send + Sync {
    /// Insert a new record.
    ///
    /// # Errors
    ///
    /// `StoreError::AlreadyExists` if the identifier is live; the store is unchanged.
    fn create(&self, record: Record) -> Result<Record, StoreError>;

    /// Fetch one record.
    fn get(&self, id: &SubjectId) -> Result<Record, StoreError>;

    /// Replace a record's profile fields in place.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if the identifier is not live; the store is unchanged.
    fn update(&self, id: &SubjectId, fields: RecordFields) -> Result<Record, StoreError>;

    /// Remove a record, returning what was removed.
    fn delete(&self, id: &SubjectId) -> Result<Record, StoreError>;

    /// Consistent snapshot of all live records in insertion order.
    fn list(&self) -> Result<Vec<Record>, StoreError>;

    /// Overwrite the current-request slot.
    fn write_preferences(&self, preferences: MatchPreferences) -> Result<(), StoreError>;

    /// Read the current-request slot.
    fn read_preferences(&self) -> Result<Option<MatchPreferences>, StoreError>;
}
