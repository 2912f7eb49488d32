//! Reply status vocabulary.

use crate::domain::envelope::RequestKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome carried in every reply's `statusCode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    Success,
    /// A required payload field is absent.
    FieldMissing,
    /// A field is present but has the wrong shape.
    InvalidInput,
    NotFound,
    /// CREATE for a subject that already exists.
    Conflict,
    /// RECOMMEND with no record other than the requester.
    NoCandidates,
    StoreFailure,
    /// Scorer or classifier could not run, failed, or timed out.
    ScorerFailure,
    /// Scorer ran but its output could not be interpreted.
    ScorerOutputInvalid,
    InternalFailure,
}

impl StatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Success => "SUCCESS",
            StatusCode::FieldMissing => "FIELD_MISSING",
            StatusCode::InvalidInput => "INVALID_INPUT",
            StatusCode::NotFound => "NOT_FOUND",
            StatusCode::Conflict => "CONFLICT",
            StatusCode::NoCandidates => "NO_CANDIDATES",
            StatusCode::StoreFailure => "STORE_FAILURE",
            StatusCode::ScorerFailure => "SCORER_FAILURE",
            StatusCode::ScorerOutputInvalid => "SCORER_OUTPUT_INVALID",
            StatusCode::InternalFailure => "INTERNAL_FAILURE",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StatusCode::Success)
    }

    /// HTTP status used by the ingress for this outcome.
    pub fn http_status(&self, kind: Option<RequestKind>) -> u16 {
        match self {
            StatusCode::Success if kind == Some(RequestKind::Create) => 201,
            StatusCode::Success => 200,
            StatusCode::FieldMissing | StatusCode::InvalidInput => 400,
            StatusCode::NotFound => 404,
            StatusCode::Conflict | StatusCode::NoCandidates => 409,
            StatusCode::StoreFailure
            | StatusCode::ScorerFailure
            | StatusCode::ScorerOutputInvalid
            | StatusCode::InternalFailure => 500,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
