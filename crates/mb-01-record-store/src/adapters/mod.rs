//! # Adapters
//!
//! - `storage` - `TableStorage` implementations
//! - `lock` - process-level exclusive lock on the store file

pub mod lock;
pub mod storage;
