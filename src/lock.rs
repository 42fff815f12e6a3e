//! Registry locking for concurrent invocations.
//!
//! Uses advisory file locks (`flock(2)` on Unix) via the `fs2` crate. The OS
//! releases the lock when the holding process exits, so a crashed run never
//! leaves a stale lock behind.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::{CommitwatchError, Result};

/// How long a registry mutation waits for another process before giving up.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// An exclusive lock on the registry, held until dropped.
pub struct RegistryLock {
    _file: File,
}

impl RegistryLock {
    /// Acquire the lock file at `lock_path`, polling until `timeout` expires.
    ///
    /// Returns [`CommitwatchError::ConcurrentAccess`] when another process
    /// keeps holding it.
    pub fn acquire(lock_path: &Path, timeout: Duration) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(lock_path)?;

        let start = Instant::now();
        let poll_interval = Duration::from_millis(10);

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(RegistryLock { _file: file }),
                Err(_) if start.elapsed() >= timeout => {
                    return Err(CommitwatchError::ConcurrentAccess(lock_path.to_path_buf()));
                }
                Err(_) => std::thread::sleep(poll_interval),
            }
        }
    }
}
