//! Bridge error taxonomy.
//!
//! Every failure inside dispatch becomes one of these and, through
//! `status()`, exactly one reply status.

use crate::domain::status::StatusCode;
use mb_01_record_store::StoreError;
use mb_02_scorer::ScorerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Field missing: {0}")]
    FieldMissing(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record already exists: {0}")]
    Conflict(String),

    #[error("No eligible records to match against")]
    NoCandidates,

    #[error("Record store failure: {0}")]
    Store(String),

    #[error("Scorer failure: {0}")]
    Scorer(#[from] ScorerError),

    #[error("Internal failure: {0}")]
    Internal(String),
}

impl BridgeError {
    pub fn status(&self) -> StatusCode {
        match self {
            BridgeError::FieldMissing(_) => StatusCode::FieldMissing,
            BridgeError::InvalidInput(_) => StatusCode::InvalidInput,
            BridgeError::NotFound(_) => StatusCode::NotFound,
            BridgeError::Conflict(_) => StatusCode::Conflict,
            BridgeError::NoCandidates => StatusCode::NoCandidates,
            BridgeError::Store(_) => StatusCode::StoreFailure,
            BridgeError::Scorer(e) if e.is_output_invalid() => StatusCode::ScorerOutputInvalid,
            BridgeError::Scorer(_) => StatusCode::ScorerFailure,
            BridgeError::Internal(_) => StatusCode::InternalFailure,
        }
    }

    /// Diagnostic text for the reply's `details`, when there is more to say
    /// than the message.
    pub fn details(&self) -> Option<String> {
        match self {
            BridgeError::Scorer(e) => e.diagnostics().map(str::to_string),
            BridgeError::Store(detail) | BridgeError::Internal(detail) => Some(detail.clone()),
            _ => None,
        }
    }
}

impl From<StoreError> for BridgeError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(id) => BridgeError::Conflict(id.to_string()),
            StoreError::NotFound(id) => BridgeError::NotFound(id.to_string()),
            other => BridgeError::Store(other.to_string()),
        }
    }
}
