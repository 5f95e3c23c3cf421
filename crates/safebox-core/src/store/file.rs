//! File locking and atomic writes for file-backed stores
//!
//! A read/modify/write cycle on a store file is a critical section. Two
//! overlapping cycles would silently drop one writer's changes, so every
//! cycle holds an in-process mutex and an OS lock on a sidecar file for its
//! whole duration, and writes go to a temporary file that is renamed over
//! the target.

use std::fs::{self, File, OpenOptions, TryLockError};
use std::io::{ErrorKind, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tempfile::NamedTempFile;

use super::traits::{StoreError, StoreResult};
use crate::logging::file_logger as log;

const LOCK_RETRIES: u32 = 250;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(20);

/// Exclusive lock on a store file, released on drop
///
/// The lock is an advisory OS lock held on an open `<file>.lock` handle.
/// The kernel drops it when the handle closes, including when the owning
/// process dies, so a crashed deploy never leaves the store locked. The
/// sidecar file itself is left in place: unlinking it would let a waiter
/// and a newcomer lock two different inodes.
///
/// Waiting is a blocking sleep on the calling thread (up to about five
/// seconds) and file stores do their I/O synchronously, so async callers
/// that share a runtime with other work should drive file stores from a
/// blocking-capable thread.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    file: File,
}

impl FileLock {
    /// Acquire the lock for `target`, waiting briefly if it is held
    pub fn acquire(target: &Path) -> StoreResult<Self> {
        for attempt in 0..=LOCK_RETRIES {
            if let Some(lock) = Self::try_acquire(target)? {
                return Ok(lock);
            }
            if attempt < LOCK_RETRIES {
                thread::sleep(LOCK_RETRY_DELAY);
            }
        }

        let path = lock_path(target);
        log::warn("FileLock", &format!("gave up waiting for {}", path.display()));
        Err(StoreError::Locked { path })
    }

    /// Take the lock if nobody holds it; `None` when it is held elsewhere
    pub fn try_acquire(target: &Path) -> StoreResult<Option<Self>> {
        let path = lock_path(target);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => return Ok(None),
            Err(TryLockError::Error(e)) => return Err(StoreError::Io(e)),
        }

        // Owner pid, for whoever inspects a lock that is taking long
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        writeln!(file, "{}", std::process::id())?;

        Ok(Some(Self { path, file }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            log::warn("FileLock", &format!("failed to release {}: {}", self.path.display(), e));
        }
    }
}

fn lock_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    target.with_file_name(name)
}

/// Read a store file; a missing file yields `None`
pub fn read_if_exists(path: &Path) -> StoreResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::Io(e)),
    }
}

/// Replace `path` with `contents` via a temporary file in the same directory
pub fn atomic_write(path: &Path, contents: &[u8]) -> StoreResult<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

/// Create the store directory if needed
pub fn ensure_dir(dir: &Path) -> StoreResult<()> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| {
        StoreError::configuration(format!("cannot create store directory {}: {}", dir.display(), e))
    })
}
