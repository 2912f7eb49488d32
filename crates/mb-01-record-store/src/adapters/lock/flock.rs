use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use thiserror::Error;
use tracing::{debug, warn};

/// How long `StoreLock::acquire` keeps retrying.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from store locking
#[derive(Debug, Error)]
pub enum LockError {
    /// Lock file could not be created
    #[error("Failed to create lock file: {0}")]
    CreateFailed(#[source] io::Error),

    /// Store is already locked by another process
    #[error("Store already in use{} ({})", .pid.map(|p| format!(" by process {p}")).unwrap_or_default(), .path.display())]
    AlreadyLocked { pid: Option<u32>, path: PathBuf },

    /// Failed to write PID to lock file
    #[error("Failed to write PID to lock file: {0}")]
    WriteFailed(#[source] io::Error),
}

/// Exclusive lock guarding one store file.
///
/// Held for the lifetime of the store, released on drop (RAII).
pub struct StoreLock {
    /// The lock file handle (kept open to maintain lock)
    file: File,
    path: PathBuf,
    pid: u32,
}

impl StoreLock {
    /// Lock file for a store file: `users.csv` -> `users.csv.lock`.
    pub fn path_for(store_path: &Path) -> PathBuf {
        let mut name = store_path.as_os_str().to_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Acquire the lock with `DEFAULT_LOCK_TIMEOUT`.
    pub fn acquire(lock_path: &Path) -> Result<Self, LockError> {
        Self::acquire_with_timeout(lock_path, DEFAULT_LOCK_TIMEOUT)
    }

    /// Acquire the lock, retrying with exponential backoff until `timeout`.
    ///
    /// Ownership is the OS lock alone, which the kernel drops when its holder
    /// exits. The PID written into the file is informational and never used to
    /// decide whether the lock is free.
    ///
    /// # Errors
    ///
    /// Returns `LockError::AlreadyLocked` if another holder keeps the lock
    /// past the timeout.
    pub fn acquire_with_timeout(lock_path: &Path, timeout: Duration) -> Result<Self, LockError> {
        let deadline = Instant::now() + timeout;
        let mut retry_delay = Duration::from_millis(20);

        loop {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .read(true)
                .write(true)
                .open(lock_path)
                .map_err(LockError::CreateFailed)?;

            match file.try_lock_exclusive() {
                Ok(()) => {
                    let pid = std::process::id();
                    let mut locked_file = file;
                    locked_file.set_len(0).map_err(LockError::WriteFailed)?;
                    writeln!(locked_file, "{}", pid).map_err(LockError::WriteFailed)?;
                    locked_file.sync_all().map_err(LockError::WriteFailed)?;

                    debug!(path = %lock_path.display(), pid, "Store lock acquired");
                    return Ok(Self {
                        file: locked_file,
                        path: lock_path.to_path_buf(),
                        pid,
                    });
                }
                Err(_) => {
                    if Instant::now() >= deadline {
                        let pid = Self::read_existing_pid(lock_path);
                        warn!(path = %lock_path.display(), pid = ?pid, "Store lock still held");
                        return Err(LockError::AlreadyLocked {
                            pid,
                            path: lock_path.to_path_buf(),
                        });
                    }

                    drop(file);
                    std::thread::sleep(retry_delay);
                    retry_delay = (retry_delay * 2).min(Duration::from_millis(500));
                }
            }
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_existing_pid(path: &Path) -> Option<u32> {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }
}

impl Drop for StoreLock {
    /// Unlock only. The file stays so a waiter holding an open handle to it
    /// never ends up locking an unlinked inode.
    fn drop(&mut self) {
        #[allow(clippy::incompatible_msrv)]
        let _ = self.file.unlock();
    }
}
