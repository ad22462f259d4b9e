//! Non-blocking advisory directory locks

use crate::{Error, NormalizedPath, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};

/// An exclusive advisory lock on a file inside a directory.
///
/// The lock is taken with `try_lock_exclusive`, so a second holder is
/// reported immediately as [`Error::LockHeld`] instead of blocking. The lock
/// is released when the guard is dropped. The lock file itself is left in
/// place; removing it would race with a process that has just opened it.
///
/// While held, the file contains the holder's process id. It is emptied
/// again on release, so observers can tell an idle lock file apart without
/// locking it.
#[derive(Debug)]
pub struct DirLock {
    file: File,
    path: NormalizedPath,
}

impl DirLock {
    /// Try to lock `dir/file_name`, creating `dir` and the lock file if needed.
    pub fn try_acquire(dir: &NormalizedPath, file_name: &str) -> Result<Self> {
        let native_dir = dir.to_native();
        std::fs::create_dir_all(&native_dir).map_err(|e| Error::io(&native_dir, e))?;

        let path = dir.join(file_name);
        let native_path = path.to_native();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&native_path)
            .map_err(|e| Error::io(&native_path, e))?;

        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                return Err(Error::LockHeld { path: native_path });
            }
            Err(source) => {
                return Err(Error::LockFailed {
                    path: native_path,
                    source,
                });
            }
        }

        let mut lock = Self { file, path };
        lock.write_marker(&std::process::id().to_string())
            .map_err(|e| Error::io(&native_path, e))?;
        tracing::debug!(path = %lock.path, "acquired directory lock");
        Ok(lock)
    }

    /// Whether some holder currently owns the lock at `dir/file_name`.
    ///
    /// Never creates anything; a missing or empty lock file means unlocked
    /// and is answered without touching the lock. Only a file still carrying
    /// a holder's marker is tried against the lock, to tell a live holder
    /// from one that crashed before clearing it.
    pub fn is_held(dir: &NormalizedPath, file_name: &str) -> bool {
        let native_path = dir.join(file_name).to_native();
        let Ok(mut file) = OpenOptions::new().read(true).open(&native_path) else {
            return false;
        };

        let mut marker = String::new();
        // Reading a locked file fails on Windows; fall through to the lock check
        if file.read_to_string(&mut marker).is_ok() && marker.trim().is_empty() {
            return false;
        }

        match FileExt::try_lock_shared(&file) {
            Ok(()) => {
                let _ = FileExt::unlock(&file);
                false
            }
            Err(_) => true,
        }
    }

    /// Path of the lock file.
    pub fn path(&self) -> &NormalizedPath {
        &self.path
    }
}

impl DirLock {
    fn write_marker(&mut self, marker: &str) -> std::io::Result<()> {
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(marker.as_bytes())?;
        self.file.sync_data()
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        if let Err(e) = self.write_marker("") {
            tracing::debug!(path = %self.path, error = %e, "failed to clear lock marker");
        }
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path, error = %e, "failed to release directory lock");
        } else {
            tracing::debug!(path = %self.path, "released directory lock");
        }
    }
}
