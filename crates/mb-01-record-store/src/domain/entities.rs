//! # Record Store Entities
//!
//! Records, their mutable profile fields, and the matcher preferences held in
//! the current-request slot. Cell conversions live here so that every storage
//! adapter agrees on column order.

use crate::domain::errors::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Record header, in persisted column order.
pub const RECORD_COLUMNS: [&str; 8] = [
    "uuid",
    "age",
    "contactFrequency",
    "gender",
    "hobby",
    "major",
    "mbti",
    "duplication",
];

/// Current-request header, in persisted column order.
pub const PREFERENCE_COLUMNS: [&str; 10] = [
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

/// Stable identifier of a user record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The mutable part of a record, as supplied by CREATE and UPDATE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFields {
    pub age: String,
    pub contact_frequency: String,
    pub gender: String,
    pub hobby: String,
    pub major: String,
    pub mbti: String,
    /// Only UPDATE may set the flag; CREATE always starts at `false`.
    pub duplication: Option<bool>,
}

/// A user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub uuid: SubjectId,
    pub age: String,
    pub contact_frequency: String,
    pub gender: String,
    pub hobby: String,
    pub major: String,
    pub mbti: String,
    pub duplication: bool,
}

impl Record {
    /// A fresh record. The duplication flag starts cleared.
    pub fn new(uuid: SubjectId, fields: RecordFields) -> Self {
        let mut record = Self {
            uuid,
            age: String::new(),
            contact_frequency: String::new(),
            gender: String::new(),
            hobby: String::new(),
            major: String::new(),
            mbti: String::new(),
            duplication: false,
        };
        record.apply(RecordFields {
            duplication: None,
            ..fields
        });
        record
    }

    /// Replace profile fields in place. A `None` duplication keeps the flag.
    pub fn apply(&mut self, fields: RecordFields) {
        self.age = fields.age;
        self.contact_frequency = fields.contact_frequency;
        self.gender = fields.gender;
        self.hobby = fields.hobby;
        self.major = fields.major;
        self.mbti = fields.mbti;
        if let Some(flag) = fields.duplication {
            self.duplication = flag;
        }
    }

    /// Cells in `RECORD_COLUMNS` order.
    pub fn to_cells(&self) -> [String; 8] {
        [
            self.uuid.to_string(),
            self.age.clone(),
            self.contact_frequency.clone(),
            self.gender.clone(),
            self.hobby.clone(),
            self.major.clone(),
            self.mbti.clone(),
            flag_cell(self.duplication).to_string(),
        ]
    }

    /// Parse cells in `RECORD_COLUMNS` order.
    pub fn from_cells(cells: &[&str]) -> Result<Self, StoreError> {
        let [uuid, age, contact_frequency, gender, hobby, major, mbti, duplication] = cells else {
            return Err(StoreError::Malformed(format!(
                "record row has {} cells, expected {}",
                cells.len(),
                RECORD_COLUMNS.len()
            )));
        };
        if uuid.is_empty() {
            return Err(StoreError::Malformed("record row without uuid".into()));
        }
        let duplication = parse_flag(duplication).ok_or_else(|| {
            StoreError::Malformed(format!("record {uuid}: bad duplication flag {duplication:?}"))
        })?;

        Ok(Self {
            uuid: SubjectId::new(*uuid),
            age: age.to_string(),
            contact_frequency: contact_frequency.to_string(),
            gender: gender.to_string(),
            hobby: hobby.to_string(),
            major: major.to_string(),
            mbti: mbti.to_string(),
            duplication,
        })
    }
}

/// Matcher preferences written to the current-request slot before scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPreferences {
    pub matcher_uuid: SubjectId,
    pub contact_frequency_option: String,
    pub my_gender: String,
    pub hobby_option: String,
    pub same_major_option: bool,
    pub age_option: String,
    pub mbti_option: String,
    pub my_major: String,
    pub my_age: String,
    pub duplication_list: String,
}

impl MatchPreferences {
    /// Cells in `PREFERENCE_COLUMNS` order.
    pub fn to_cells(&self) -> [String; 10] {
        [
            self.matcher_uuid.to_string(),
            self.contact_frequency_option.clone(),
            self.my_gender.clone(),
            self.hobby_option.clone(),
            flag_cell(self.same_major_option).to_string(),
            self.age_option.clone(),
            self.mbti_option.clone(),
            self.my_major.clone(),
            self.my_age.clone(),
            self.duplication_list.clone(),
        ]
    }

    /// Parse the slot row. An all-empty row means the slot is unset.
    pub fn from_cells(cells: &[&str]) -> Result<Option<Self>, StoreError> {
        if cells.iter().all(|c| c.is_empty()) {
            return Ok(None);
        }
        let [matcher_uuid, contact_frequency_option, my_gender, hobby_option, same_major_option, age_option, mbti_option, my_major, my_age, duplication_list] =
            cells
        else {
            return Err(StoreError::Malformed(format!(
                "request row has {} cells, expected {}",
                cells.len(),
                PREFERENCE_COLUMNS.len()
            )));
        };
        let same_major_option = parse_flag(same_major_option).ok_or_else(|| {
            StoreError::Malformed(format!("bad sameMajorOption flag {same_major_option:?}"))
        })?;

        Ok(Some(Self {
            matcher_uuid: SubjectId::new(*matcher_uuid),
            contact_frequency_option: contact_frequency_option.to_string(),
            my_gender: my_gender.to_string(),
            hobby_option: hobby_option.to_string(),
            same_major_option,
            age_option: age_option.to_string(),
            mbti_option: mbti_option.to_string(),
            my_major: my_major.to_string(),
            my_age: my_age.to_string(),
            duplication_list: duplication_list.to_string(),
        }))
    }
}

/// Persisted spelling of a boolean cell.
pub fn flag_cell(flag: bool) -> &'static str {
    if flag {
        "TRUE"
    } else {
        "FALSE"
    }
}

/// Case-insensitive `TRUE`/`FALSE`.
pub fn parse_flag(cell: &str) -> Option<bool> {
    if cell.eq_ignore_ascii_case("true") {
        Some(true)
    } else if cell.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
