//! Advisory file locks for externally shared resources.
//!
//! Nothing in this crate is concurrent, but two directories are shared with
//! other *processes*: the host download cache (concurrent provisioning runs)
//! and each capsule's prefix (concurrent launches of the same capsule). Both
//! critical sections take an exclusive lock here.

use std::fs::{File, OpenOptions};
use std::path::Path;

use anyhow::{Context, Result};
use fs2::FileExt;

/// Exclusive advisory lock held for the duration of a critical section.
///
/// Released when dropped, so every exit path -- including errors and panics
/// while the guard is live -- gives the lock back.
#[must_use]
pub struct LockGuard {
    file: File,
}

impl LockGuard {
    /// Block until the lock file at `path` is exclusively held. Parent
    /// directories and the lock file itself are created as needed.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create lock file directory '{}'", parent.display())
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("failed to open lock file '{}'", path.display()))?;

        file.lock_exclusive()
            .with_context(|| format!("failed to acquire exclusive lock on '{}'", path.display()))?;

        Ok(Self { file })
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
