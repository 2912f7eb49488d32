//! # Ports
//!
//! What the bridge needs from a scoring backend. Implementations may run a
//! local process, call a remote service, or compute in-process.

use crate::domain::candidate::Candidate;
use crate::domain::errors::ScorerError;
use async_trait::async_trait;
use mb_01_record_store::MatchPreferences;

/// Ranks candidates for one matcher.
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Best candidate for the preferences just written to the store.
    ///
    /// The computation reads the store itself; `preferences` is what the
    /// caller wrote and is passed for logging and in-process backends.
    async fn recommend(&self, preferences: &MatchPreferences) -> Result<Candidate, ScorerError>;
}

/// Maps category labels to broader categories.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Broad categories for `labels`, as reported by the backend.
    ///
    /// The result may hold a single label standing for all inputs; callers
    /// reconcile counts with `align_categories`.
    async fn classify(&self, subject: &str, labels: &[String]) -> Result<Vec<String>, ScorerError>;
}
