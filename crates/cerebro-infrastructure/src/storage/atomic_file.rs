//! Atomic file writes and exclusive file locks.
//!
//! Writes go to a hidden temp file in the target's directory, are fsynced,
//! then renamed over the target, so readers see either the old or the new
//! content and never a partial file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write as IoWrite};
use std::path::{Path, PathBuf};

/// Atomically replaces the content of `path` with `bytes`.
///
/// Creates the parent directory if needed.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    // Write to temporary file in the same directory
    let tmp_path = temp_path(path)?;
    let mut tmp_file = File::create(&tmp_path)?;
    tmp_file.write_all(bytes)?;

    // Ensure data is written to disk
    tmp_file.sync_all()?;
    drop(tmp_file);

    // Atomic rename
    fs::rename(&tmp_path, path)
}

/// Gets a temporary file path for atomic writes.
fn temp_path(path: &Path) -> io::Result<PathBuf> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no parent directory"))?;

    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no file name"))?;

    let tmp_name = format!(".{}.tmp", file_name.to_string_lossy());
    Ok(parent.join(tmp_name))
}

/// A file lock guard that releases the lock when dropped.
///
/// The `.lock` file itself is left in place: unlinking it would let a waiter
/// hold a lock on the old inode while a newcomer locks a fresh file.
pub struct FileLock {
    #[allow(dead_code)]
    file: File,
}

impl FileLock {
    /// Acquires an exclusive lock guarding `path` (via a sibling `.lock` file).
    pub fn acquire(path: &Path) -> io::Result<Self> {
        // Create lock file path
        let lock_path = path.with_extension("lock");

        // Ensure parent directory exists
        if let Some(parent) = lock_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive()?;
        }

        Ok(FileLock { file })
    }
}
