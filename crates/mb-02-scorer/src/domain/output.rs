//! # Output Parsing
//!
//! Turns captured stdout into a `Candidate` or a category list.

use crate::domain::candidate::Candidate;
use crate::domain::errors::ScorerError;
use crate::{CANDIDATE_MARKER, CATEGORY_MARKER, OUTPUT_SCHEMA_VERSION};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a process reports its result on stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Last non-empty line is a versioned JSON document.
    #[default]
    Json,
    /// Free text with fixed marker strings.
    Marker,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "marker" => Ok(OutputFormat::Marker),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[derive(Deserialize)]
struct RecommendationDoc {
    candidate: Candidate,
}

#[derive(Deserialize)]
struct ClassificationDoc {
    #[serde(rename = "bigCategory")]
    big_category: Vec<String>,
}

/// Parse scorer stdout.
pub fn parse_recommendation(stdout: &str, format: OutputFormat) -> Result<Candidate, ScorerError> {
    let candidate = match format {
        OutputFormat::Json => versioned_document::<RecommendationDoc>(stdout)?.candidate,
        OutputFormat::Marker => candidate_block(stdout)?,
    };

    if candidate.uuid.trim().is_empty() {
        return Err(ScorerError::output_invalid("candidate has no uuid", stdout));
    }
    Ok(candidate)
}

/// Parse classifier stdout.
pub fn parse_categories(stdout: &str, format: OutputFormat) -> Result<Vec<String>, ScorerError> {
    let labels = match format {
        OutputFormat::Json => versioned_document::<ClassificationDoc>(stdout)?.big_category,
        OutputFormat::Marker => category_line(stdout)?,
    };

    if labels.is_empty() {
        return Err(ScorerError::output_invalid("no categories reported", stdout));
    }
    Ok(labels)
}

/// Reconcile classifier labels with the number of requested inputs.
///
/// A single label for several inputs applies to all of them. Any other
/// count mismatch is `OutputInvalid`.
pub fn align_categories(requested: usize, labels: Vec<String>) -> Result<Vec<String>, ScorerError> {
    match labels.len() {
        n if n == requested => Ok(labels),
        1 if requested > 1 => Ok(vec![labels[0].clone(); requested]),
        n => Err(ScorerError::output_invalid(
            format!("Mismatch in category count: requested {requested}, got {n}"),
            &labels.join(", "),
        )),
    }
}

fn versioned_document<T: serde::de::DeserializeOwned>(stdout: &str) -> Result<T, ScorerError> {
    let line = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| ScorerError::output_invalid("empty output", stdout))?;

    let value: serde_json::Value = serde_json::from_str(line)
        .map_err(|e| ScorerError::output_invalid(format!("last line is not JSON: {e}"), stdout))?;

    match value.get("version").and_then(serde_json::Value::as_u64) {
        Some(OUTPUT_SCHEMA_VERSION) => {}
        Some(other) => {
            return Err(ScorerError::output_invalid(
                format!("unsupported output version {other}"),
                stdout,
            ))
        }
        None => return Err(ScorerError::output_invalid("missing output version", stdout)),
    }

    serde_json::from_value(value)
        .map_err(|e| ScorerError::output_invalid(format!("unexpected document shape: {e}"), stdout))
}

fn candidate_block(stdout: &str) -> Result<Candidate, ScorerError> {
    let start = stdout
        .find(CANDIDATE_MARKER)
        .ok_or_else(|| ScorerError::output_invalid("candidate marker not found", stdout))?;
    let block = &stdout[start + CANDIDATE_MARKER.len()..];

    let mut uuid = None;
    let mut candidate = Candidate::new(String::new());
    for (key, value) in block.lines().filter_map(key_value) {
        if key == "uuid" {
            uuid = Some(value.to_string());
        } else {
            candidate
                .attributes
                .insert(key.to_string(), serde_json::Value::String(value.to_string()));
        }
    }

    candidate.uuid = uuid.ok_or_else(|| ScorerError::output_invalid("empty result block", stdout))?;
    Ok(candidate)
}

/// `key value` or `key: value`.
fn key_value(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if let Some((key, value)) = line.split_once(':') {
        if !key.is_empty() && !key.contains(char::is_whitespace) {
            let value = value.trim();
            return (!value.is_empty()).then_some((key, value));
        }
    }
    let (key, value) = line.split_once(char::is_whitespace)?;
    let value = value.trim();
    (!value.is_empty()).then_some((key, value))
}

fn category_line(stdout: &str) -> Result<Vec<String>, ScorerError> {
    let line = stdout
        .lines()
        .map(str::trim)
        .find_map(|l| l.strip_prefix(CATEGORY_MARKER))
        .ok_or_else(|| ScorerError::output_invalid("Invalid big category output", stdout))?;

    Ok(line
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect())
}
