//! Atomic file replacement

use crate::{Error, NormalizedPath, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Name of the temp file [`write_atomic`] stages `file_name` in.
///
/// Per process, so concurrent writers never share a temp file.
pub fn temp_name_for(file_name: &str) -> String {
    format!(".{}.{}.tmp", file_name, std::process::id())
}

/// Whether `entry` is a temp file staged for `file_name` by any process,
/// as left behind when a writer is killed before its rename.
pub fn is_temp_for(entry: &str, file_name: &str) -> bool {
    entry
        .strip_prefix('.')
        .and_then(|rest| rest.strip_prefix(file_name))
        .and_then(|rest| rest.strip_prefix('.'))
        .and_then(|rest| rest.strip_suffix(".tmp"))
        .is_some_and(|pid| !pid.is_empty() && pid.chars().all(|c| c.is_ascii_digit()))
}

/// Replace `path` with `content` so readers see either the old file or the
/// new one, never a torn write.
///
/// The content is staged next to the target, synced, then renamed over it.
/// A failed write removes its temp file again.
pub fn write_atomic(path: &NormalizedPath, content: &[u8]) -> Result<()> {
    let target = path.to_native();
    let (dir, name) = match (target.parent(), path.file_name()) {
        (Some(dir), Some(name)) => (dir.to_path_buf(), name.to_string()),
        _ => {
            return Err(Error::io(
                &target,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a file path"),
            ));
        }
    };
    fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;

    let staged = dir.join(temp_name_for(&name));
    if let Err(e) = stage(&staged, content).and_then(|()| rename(&staged, &target)) {
        let _ = fs::remove_file(&staged);
        return Err(e);
    }

    tracing::debug!(path = %path, bytes = content.len(), "replaced file");
    Ok(())
}

fn stage(staged: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(staged).map_err(|e| Error::io(staged, e))?;
    file.write_all(content)
        .and_then(|()| file.sync_all())
        .map_err(|e| Error::io(staged, e))
}

fn rename(staged: &Path, target: &Path) -> Result<()> {
    fs::rename(staged, target).map_err(|e| Error::io(target, e))
}

/// Read a whole UTF-8 file, naming the path on failure.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    fs::read_to_string(&native_path).map_err(|e| Error::io(&native_path, e))
}
