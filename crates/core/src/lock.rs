//! Repository locking.
//!
//! Uses advisory file locks (`flock(2)` on Unix) via the `fs2` crate. The OS
//! releases the lock when the process exits, so there is no stale-lock
//! cleanup to do.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::time::{Duration, Instant};

use fs2::FileExt;
use tracing::debug;

use crate::errors::StoreError;

/// Name of the lock file inside the control directory.
pub const LOCK_FILE: &str = "giestro.lock";

/// An exclusive repository lock, released on drop.
#[derive(Debug)]
pub struct RepoLock {
    _file: File,
}

impl RepoLock {
    /// Acquire the lock in `control_dir`, polling until `timeout` expires.
    pub fn acquire(control_dir: &Path, timeout: Duration) -> Result<Self, StoreError> {
        let lock_path = control_dir.join(LOCK_FILE);
        let file = open_lock_file(&lock_path)?;

        let start = Instant::now();
        let poll_interval = Duration::from_millis(10);

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    debug!(path = %lock_path.display(), "acquired repository lock");
                    return Ok(RepoLock { _file: file });
                }
                Err(_) if start.elapsed() >= timeout => {
                    return Err(StoreError::Locked(lock_path));
                }
                Err(_) => std::thread::sleep(poll_interval),
            }
        }
    }

    /// Move the lock onto the lock file in `control_dir`, releasing the old
    /// one. Used when the control directory is rebuilt while the lock is held:
    /// lock the new copy first, then move it into place.
    pub fn relock(&mut self, control_dir: &Path) -> Result<(), StoreError> {
        let lock_path = control_dir.join(LOCK_FILE);
        let file = open_lock_file(&lock_path)?;
        file.try_lock_exclusive()
            .map_err(|_| StoreError::Locked(lock_path.clone()))?;
        self._file = file;
        debug!(path = %lock_path.display(), "moved repository lock");
        Ok(())
    }
}

fn open_lock_file(lock_path: &Path) -> Result<File, StoreError> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(lock_path)
        .map_err(|e| StoreError::io(lock_path, e))
}
