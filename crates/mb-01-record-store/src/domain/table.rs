//! # Record Table
//!
//! The whole store as one value: the current-request slot plus records in
//! insertion order. Storage adapters load and save it; the service mutates a
//! copy and commits it only after a successful save.

use crate::domain::entities::{MatchPreferences, Record, RecordFields, SubjectId};
use crate::domain::errors::StoreError;
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordTable {
    preferences: Option<MatchPreferences>,
    records: Vec<Record>,
}

impl RecordTable {
    /// Build a table from loaded parts, rejecting duplicate identifiers.
    pub fn new(
        preferences: Option<MatchPreferences>,
        records: Vec<Record>,
    ) -> Result<Self, StoreError> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert(&record.uuid) {
                return Err(StoreError::Malformed(format!(
                    "duplicate record {}",
                    record.uuid
                )));
            }
        }
        Ok(Self {
            preferences,
            records,
        })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn preferences(&self) -> Option<&MatchPreferences> {
        self.preferences.as_ref()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &SubjectId) -> Option<&Record> {
        self.records.iter().find(|r| &r.uuid == id)
    }

    pub fn insert(&mut self, record: Record) -> Result<(), StoreError> {
        if self.get(&record.uuid).is_some() {
            return Err(StoreError::AlreadyExists(record.uuid));
        }
        self.records.push(record);
        Ok(())
    }

    pub fn update(&mut self, id: &SubjectId, fields: RecordFields) -> Result<Record, StoreError> {
        let record = self
            .records
            .iter_mut()
            .find(|r| &r.uuid == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        record.apply(fields);
        Ok(record.clone())
    }

    pub fn remove(&mut self, id: &SubjectId) -> Result<Record, StoreError> {
        let index = self
            .records
            .iter()
            .position(|r| &r.uuid == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        Ok(self.records.remove(index))
    }

    pub fn set_preferences(&mut self, preferences: MatchPreferences) {
        self.preferences = Some(preferences);
    }
}
