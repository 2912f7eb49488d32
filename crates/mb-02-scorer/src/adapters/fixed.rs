//! # Fixed Adapters
//!
//! Scripted backends that answer with a preset outcome and record what they
//! were asked.

use crate::domain::candidate::Candidate;
use crate::domain::errors::ScorerError;
use crate::ports::{Classifier, Scorer};
use async_trait::async_trait;
use mb_01_record_store::MatchPreferences;
use parking_lot::Mutex;
use std::time::Duration;

/// `Scorer` with a preset outcome.
pub struct FixedScorer {
    outcome: Mutex<Result<Candidate, ScorerError>>,
    delay: Option<Duration>,
    seen: Mutex<Vec<MatchPreferences>>,
}

impl FixedScorer {
    pub fn returning(candidate: Candidate) -> Self {
        Self::with_outcome(Ok(candidate))
    }

    pub fn failing(error: ScorerError) -> Self {
        Self::with_outcome(Err(error))
    }

    fn with_outcome(outcome: Result<Candidate, ScorerError>) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            delay: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_outcome(&self, outcome: Result<Candidate, ScorerError>) {
        *self.outcome.lock() = outcome;
    }

    /// Preferences of every call, oldest first.
    pub fn seen(&self) -> Vec<MatchPreferences> {
        self.seen.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().len()
    }
}

#[async_trait]
impl Scorer for FixedScorer {
    async fn recommend(&self, preferences: &MatchPreferences) -> Result<Candidate, ScorerError> {
        self.seen.lock().push(preferences.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.lock().clone()
    }
}

/// `Classifier` with a preset outcome.
pub struct FixedClassifier {
    outcome: Mutex<Result<Vec<String>, ScorerError>>,
    seen: Mutex<Vec<(String, Vec<String>)>>,
}

impl FixedClassifier {
    pub fn returning<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_outcome(Ok(labels.into_iter().map(Into::into).collect()))
    }

    pub fn failing(error: ScorerError) -> Self {
        Self::with_outcome(Err(error))
    }

    fn with_outcome(outcome: Result<Vec<String>, ScorerError>) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// `(subject, labels)` of every call, oldest first.
    pub fn seen(&self) -> Vec<(String, Vec<String>)> {
        self.seen.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().len()
    }
}

#[async_trait]
impl Classifier for FixedClassifier {
    async fn classify(&self, subject: &str, labels: &[String]) -> Result<Vec<String>, ScorerError> {
        self.seen.lock().push((subject.to_string(), labels.to_vec()));
        self.outcome.lock().clone()
    }
}
