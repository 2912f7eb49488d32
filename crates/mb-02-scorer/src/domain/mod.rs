//! # Scorer Domain

pub mod candidate;
pub mod errors;
pub mod output;
