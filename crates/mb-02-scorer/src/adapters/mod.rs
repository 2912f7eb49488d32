//! # Adapters
//!
//! - `process` - subprocess-backed scorer and classifier
//! - `fixed` - scripted implementations for tests and dry runs

pub mod fixed;
pub mod process;
