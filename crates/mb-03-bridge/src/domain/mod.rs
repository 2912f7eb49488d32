//! Domain layer: wire envelopes, statuses, errors, configuration.

pub mod config;
pub mod correlation;
pub mod envelope;
pub mod error;
pub mod payload;
pub mod pending;
pub mod status;
