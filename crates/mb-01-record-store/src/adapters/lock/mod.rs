//! # Store Process Locking
//!
//! Prevents two processes from rewriting the same store file.
//!
//! Uses `fs2` for cross-platform file locking (flock on Unix, LockFile on Windows).

mod flock;

pub use flock::{LockError, StoreLock, DEFAULT_LOCK_TIMEOUT};
