//! Correlation ID for request/reply matching.
//!
//! Opaque to the bridge: whatever the requester sent is echoed back verbatim.
//! Requesters that need a fresh one get a UUID v7.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Token binding a reply to its request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a new correlation ID (UUID v7, time-ordered)
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Wrap a token received from the bus or HTTP. Empty tokens are rejected.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        (!token.is_empty()).then(|| Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
