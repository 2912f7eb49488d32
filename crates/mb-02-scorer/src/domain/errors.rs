//! # Scorer Errors

use std::time::Duration;
use thiserror::Error;

/// Diagnostic text kept from a failed run.
const MAX_DIAGNOSTIC_LEN: usize = 2048;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScorerError {
    /// The process could not be started.
    #[error("Failed to start {program}: {message}")]
    Spawn { program: String, message: String },

    /// The process missed its deadline and was killed.
    #[error("Scorer timed out after {}ms", .timeout.as_millis())]
    Timeout { timeout: Duration },

    /// The process crashed or exited non-zero.
    #[error("Scorer exited with status {}: {stderr}", .exit_code.map(|c| c.to_string()).unwrap_or_else(|| "signal".into()))]
    Failed {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// The process exited cleanly but its output is unusable.
    #[error("Scorer output invalid: {reason}")]
    OutputInvalid { reason: String, stdout: String },
}

impl ScorerError {
    pub fn failed(exit_code: Option<i32>, stderr: &str) -> Self {
        ScorerError::Failed {
            exit_code,
            stderr: truncate(stderr.trim()),
        }
    }

    pub fn output_invalid(reason: impl Into<String>, stdout: &str) -> Self {
        ScorerError::OutputInvalid {
            reason: reason.into(),
            stdout: truncate(stdout.trim()),
        }
    }

    /// "Ran but unusable", as opposed to "did not run to completion".
    pub fn is_output_invalid(&self) -> bool {
        matches!(self, ScorerError::OutputInvalid { .. })
    }

    /// Captured process output worth showing to the caller.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            ScorerError::Failed { stderr, .. } if !stderr.is_empty() => Some(stderr),
            ScorerError::OutputInvalid { stdout, .. } if !stdout.is_empty() => Some(stdout),
            ScorerError::Spawn { message, .. } => Some(message),
            _ => None,
        }
    }
}

fn truncate(text: &str) -> String {
    if text.len() <= MAX_DIAGNOSTIC_LEN {
        return text.to_string();
    }
    let mut end = MAX_DIAGNOSTIC_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
