//! Cross-process lock around store file writes.
//!
//! Every `FileStore` read-modify-write holds an exclusive `flock` on
//! `.padd/.lock`. The lock file is created on first use and never removed:
//! all processes must contend on the same inode, so deleting it would let a
//! late arrival lock a fresh file while an earlier waiter still holds the
//! orphaned one. If the file is replaced from outside anyway, the acquire
//! notices that the path no longer names the locked inode and retries.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub const LOCK_FILE_NAME: &str = ".lock";

/// Default wait before giving up on a contended store lock
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

const RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Held for the duration of one store write; released on drop.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not open lock file {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("timed out after {waited:?} waiting for {path}: another padd process is writing")]
    Timeout { path: PathBuf, waited: Duration },
}

impl StoreLock {
    /// Lock the store in `data_dir`, polling until `timeout` runs out.
    pub fn acquire(data_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = data_dir.join(LOCK_FILE_NAME);
        let start = Instant::now();

        loop {
            let file = open_lock_file(&path)?;
            match try_lock(&file) {
                Ok(true) if still_linked(&file, &path) => {
                    tracing::trace!(path = %path.display(), "store lock acquired");
                    return Ok(StoreLock { file, path });
                }
                // Locked an inode that was swapped out from under us
                Ok(true) => tracing::debug!(path = %path.display(), "lock file replaced, retrying"),
                Ok(false) => {}
                Err(source) => return Err(LockError::Open { path, source }),
            }

            let waited = start.elapsed();
            if waited >= timeout {
                tracing::warn!(path = %path.display(), ?waited, "store lock timed out");
                return Err(LockError::Timeout { path, waited });
            }
            std::thread::sleep(RETRY_INTERVAL);
        }
    }

    pub fn acquire_default(data_dir: &Path) -> Result<Self, LockError> {
        Self::acquire(data_dir, DEFAULT_LOCK_TIMEOUT)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        unlock(&self.file);
    }
}

fn open_lock_file(path: &Path) -> Result<File, LockError> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(|source| LockError::Open {
            path: path.to_path_buf(),
            source,
        })
}

/// `Ok(false)` when another process holds the lock
#[cfg(unix)]
fn try_lock(file: &File) -> io::Result<bool> {
    use std::os::unix::io::AsRawFd;
    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        return Ok(true);
    }
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        Some(code) if code == libc::EWOULDBLOCK || code == libc::EINTR => Ok(false),
        _ => Err(err),
    }
}

#[cfg(unix)]
fn unlock(file: &File) {
    use std::os::unix::io::AsRawFd;
    unsafe {
        libc::flock(file.as_raw_fd(), libc::LOCK_UN);
    }
}

/// The locked handle and the path still name the same inode
#[cfg(unix)]
fn still_linked(file: &File, path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (file.metadata(), std::fs::metadata(path)) {
        (Ok(held), Ok(on_disk)) => held.dev() == on_disk.dev() && held.ino() == on_disk.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> io::Result<bool> {
    Ok(true)
}

#[cfg(not(unix))]
fn unlock(_file: &File) {}

#[cfg(not(unix))]
fn still_linked(_file: &File, _path: &Path) -> bool {
    true
}
