//! # Scorer (mb-02)
//!
//! Two external computations sit behind async ports:
//!
//! - `Scorer` ranks every record against the matcher preferences held in the
//!   store's current-request slot and returns the single best candidate.
//! - `Classifier` maps fine-grained category labels to their broader category.
//!
//! The production adapters run a subprocess with a hard deadline and parse its
//! stdout. Two output formats are understood:
//!
//! ```text
//! json   (default)  {"version":1,"candidate":{"uuid":"u2","score":0.91}}
//!                   {"version":1,"bigCategory":["sports","study"]}
//!
//! marker (legacy)   Recommended Candidate Information:
//!                   uuid u2
//!                   score 0.91
//!                   대분류: sports, study
//! ```
//!
//! A crash, non-zero exit or missed deadline is `ScorerError::Failed` /
//! `ScorerError::Timeout`; a clean exit whose output cannot be used is
//! `ScorerError::OutputInvalid`, so callers can tell the two apart.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::fixed::{FixedClassifier, FixedScorer};
pub use adapters::process::{ProcessClassifier, ProcessConfig, ProcessRunner, ProcessScorer};
pub use domain::candidate::Candidate;
pub use domain::errors::ScorerError;
pub use domain::output::{align_categories, OutputFormat};
pub use ports::{Classifier, Scorer};

/// Marker that opens the candidate block in legacy scorer output.
pub const CANDIDATE_MARKER: &str = "Recommended Candidate Information:";

/// Prefix of the category line in legacy classifier output.
pub const CATEGORY_MARKER: &str = "대분류:";

/// Output schema version understood by the JSON parser.
pub const OUTPUT_SCHEMA_VERSION: u64 = 1;
