//! # Payload Validation
//!
//! Required fields per request kind and the conversion of loose JSON values
//! into the text cells the record store persists.
//!
//! Scalars are accepted as strings, numbers, or booleans (`TRUE`/`FALSE`).
//! Lists are accepted only where a field is list-valued and are kept as
//! compact JSON text. Objects are rejected. Unknown keys are ignored.

use crate::domain::envelope::{RequestEnvelope, RequestKind};
use crate::domain::error::BridgeError;
use mb_01_record_store::domain::entities::{flag_cell, parse_flag};
use mb_01_record_store::{MatchPreferences, RecordFields, SubjectId};
use serde_json::{Map, Value};

/// Profile fields shared by CREATE and UPDATE.
pub const PROFILE_FIELDS: [&str; 6] = ["age", "contactFrequency", "gender", "hobby", "major", "mbti"];

const RECORD_REQUIRED: [&str; 7] = ["uuid", "age", "contactFrequency", "gender", "hobby", "major", "mbti"];

const DELETE_REQUIRED: [&str; 1] = ["uuid"];

const RECOMMEND_REQUIRED: [&str; 10] = [
    "matcherUuid",
    "contactFrequencyOption",
    "myGender",
    "hobbyOption",
    "sameMajorOption",
    "ageOption",
    "mbtiOption",
    "myMajor",
    "myAge",
    "duplicationList",
];

const CLASSIFY_REQUIRED: [&str; 2] = ["uuid", "smallCategory"];

/// Keys whose value may be a JSON list.
const LIST_FIELDS: [&str; 2] = ["duplicationList", "smallCategory"];

pub fn required_fields(kind: RequestKind) -> &'static [&'static str] {
    match kind {
        RequestKind::Create | RequestKind::Update => &RECORD_REQUIRED,
        RequestKind::Delete => &DELETE_REQUIRED,
        RequestKind::Recommend => &RECOMMEND_REQUIRED,
        RequestKind::Classify => &CLASSIFY_REQUIRED,
    }
}

/// Check presence of every required field and return the subject.
///
/// `null` counts as absent. The first missing field in declaration order is
/// reported.
pub fn validate(envelope: &RequestEnvelope) -> Result<SubjectId, BridgeError> {
    for field in required_fields(envelope.kind) {
        if matches!(envelope.payload.get(*field), None | Some(Value::Null)) {
            return Err(BridgeError::FieldMissing((*field).to_string()));
        }
    }
    envelope
        .subject_id
        .as_deref()
        .map(SubjectId::from)
        .ok_or_else(|| {
            BridgeError::InvalidInput(format!(
                "{} must be a non-empty string",
                envelope.kind.subject_key()
            ))
        })
}

/// Render one payload value as a stored cell.
pub fn cell(payload: &Map<String, Value>, key: &str) -> Result<String, BridgeError> {
    match payload.get(key) {
        None | Some(Value::Null) => Err(BridgeError::FieldMissing(key.to_string())),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(flag_cell(*b).to_string()),
        Some(list @ Value::Array(_)) if LIST_FIELDS.contains(&key) => {
            serde_json::to_string(list).map_err(|e| BridgeError::Internal(e.to_string()))
        }
        Some(Value::Array(_)) => Err(BridgeError::InvalidInput(format!("{key} must not be a list"))),
        Some(Value::Object(_)) => Err(BridgeError::InvalidInput(format!("{key} must not be an object"))),
    }
}

/// Boolean field given as JSON bool or `TRUE`/`FALSE` text.
pub fn flag(payload: &Map<String, Value>, key: &str) -> Result<bool, BridgeError> {
    match payload.get(key) {
        None | Some(Value::Null) => Err(BridgeError::FieldMissing(key.to_string())),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) => parse_flag(s.trim())
            .ok_or_else(|| BridgeError::InvalidInput(format!("{key} must be TRUE or FALSE"))),
        Some(_) => Err(BridgeError::InvalidInput(format!("{key} must be a boolean"))),
    }
}

/// Profile fields for CREATE (`allow_duplication = false`) or UPDATE.
pub fn record_fields(
    payload: &Map<String, Value>,
    allow_duplication: bool,
) -> Result<RecordFields, BridgeError> {
    let duplication = if allow_duplication && !matches!(payload.get("duplication"), None | Some(Value::Null)) {
        Some(flag(payload, "duplication")?)
    } else {
        None
    };

    Ok(RecordFields {
        age: cell(payload, "age")?,
        contact_frequency: cell(payload, "contactFrequency")?,
        gender: cell(payload, "gender")?,
        hobby: cell(payload, "hobby")?,
        major: cell(payload, "major")?,
        mbti: cell(payload, "mbti")?,
        duplication,
    })
}

pub fn match_preferences(
    matcher: SubjectId,
    payload: &Map<String, Value>,
) -> Result<MatchPreferences, BridgeError> {
    Ok(MatchPreferences {
        matcher_uuid: matcher,
        contact_frequency_option: cell(payload, "contactFrequencyOption")?,
        my_gender: cell(payload, "myGender")?,
        hobby_option: cell(payload, "hobbyOption")?,
        same_major_option: flag(payload, "sameMajorOption")?,
        age_option: cell(payload, "ageOption")?,
        mbti_option: cell(payload, "mbtiOption")?,
        my_major: cell(payload, "myMajor")?,
        my_age: cell(payload, "myAge")?,
        duplication_list: cell(payload, "duplicationList")?,
    })
}

/// `smallCategory` as a non-empty list of strings.
pub fn category_labels(payload: &Map<String, Value>) -> Result<Vec<String>, BridgeError> {
    let Some(Value::Array(items)) = payload.get("smallCategory") else {
        return Err(BridgeError::InvalidInput("smallCategory must be a list".into()));
    };
    if items.is_empty() {
        return Err(BridgeError::InvalidInput("smallCategory must not be empty".into()));
    }
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            _ => Err(BridgeError::InvalidInput("smallCategory entries must be strings".into())),
        })
        .collect()
}
