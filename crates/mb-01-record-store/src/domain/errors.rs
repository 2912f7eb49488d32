//! # Domain Errors
//!
//! Error types for the Record Store.

use crate::adapters::lock::LockError;
use crate::domain::entities::SubjectId;
use thiserror::Error;

/// Errors that can occur during record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// CREATE on an identifier that is already live.
    #[error("Record already exists: {0}")]
    AlreadyExists(SubjectId),

    /// UPDATE/DELETE/GET on an identifier that is not live.
    #[error("Record not found: {0}")]
    NotFound(SubjectId),

    /// The backing file could not be read or written.
    #[error("Store I/O error: {message}")]
    Io { message: String },

    /// The backing file does not follow the persisted layout.
    #[error("Store file is malformed: {0}")]
    Malformed(String),

    /// Another process owns the store.
    #[error(transparent)]
    Lock(#[from] LockError),
}

impl StoreError {
    pub(crate) fn io(e: impl std::fmt::Display) -> Self {
        StoreError::Io {
            message: e.to_string(),
        }
    }

    /// True for failures of the persistence layer rather than of the request.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            StoreError::Io { .. } | StoreError::Malformed(_) | StoreError::Lock(_)
        )
    }
}
