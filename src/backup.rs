//! Sibling backup files guarding the destructive strip.
//!
//! A backup lives next to the original (`<path><suffix>`) so it shares the
//! filesystem and a restore is a single rename over the original.

use filetime::FileTime;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Default suffix appended to the original path
pub const DEFAULT_BACKUP_SUFFIX: &str = ".metaclean.bak";

/// Path of the backup for `original`
pub fn backup_path(original: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = original.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Copy `src` over `dst` byte for byte, then carry permissions and
/// timestamps across.
fn copy_with_attributes(src: &Path, dst: &Path) -> std::io::Result<()> {
    let metadata = fs::metadata(src)?;
    // fs::copy carries the permission bits
    fs::copy(src, dst)?;

    let mtime = FileTime::from_last_modification_time(&metadata);
    let atime = FileTime::from_last_access_time(&metadata);
    if let Err(e) = filetime::set_file_times(dst, atime, mtime) {
        warn!("Failed to restore timestamps on {}: {}", dst.display(), e);
    }
    Ok(())
}

/// A backup that exists on disk for the duration of one risky operation.
#[derive(Debug)]
pub struct Backup {
    original: PathBuf,
    path: PathBuf,
}

impl Backup {
    /// Snapshot `original`. Refuses to overwrite an existing backup, since
    /// that file may be the only intact copy left by an interrupted run.
    pub fn create(original: &Path, suffix: &str) -> Result<Self> {
        let path = backup_path(original, suffix);

        if path.exists() {
            return Err(Error::backup(
                original,
                format!(
                    "a backup from an earlier run already exists at {} (run `metaclean recover` to restore it, or delete it if the file was already cleaned)",
                    path.display()
                ),
            ));
        }

        debug!("Creating backup: {}", path.display());
        if let Err(e) = copy_with_attributes(original, &path) {
            // A partial copy must not be mistaken for a good backup later
            let _ = fs::remove_file(&path);
            return Err(Error::backup(original, e));
        }

        Ok(Backup {
            original: original.to_path_buf(),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Operation succeeded: the backup is no longer needed.
    pub fn discard(self) -> Result<()> {
        debug!("Removing backup: {}", self.path.display());
        fs::remove_file(&self.path)?;
        Ok(())
    }

    /// Operation failed: move the backup back over the original.
    ///
    /// The original is replaced in one step, so it is either the damaged file
    /// or the intact copy, never a mix. The backup already carries the
    /// original's permissions and timestamps. On error the backup stays on
    /// disk and is handed back so the caller can report where it is.
    pub fn restore(self) -> std::result::Result<(), (Self, std::io::Error)> {
        debug!(
            "Restoring {} from {}",
            self.original.display(),
            self.path.display()
        );
        if let Err(e) = fs::rename(&self.path, &self.original) {
            return Err((self, e));
        }
        Ok(())
    }
}

/// Outcome of recovering one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoverOutcome {
    Restored,
    NoBackup,
}

/// Restore a leftover backup (from a crashed or killed run) over `original`.
pub fn recover(original: &Path, suffix: &str) -> Result<RecoverOutcome> {
    let path = backup_path(original, suffix);
    if !path.exists() {
        return Ok(RecoverOutcome::NoBackup);
    }

    let backup = Backup {
        original: original.to_path_buf(),
        path,
    };
    backup
        .restore()
        .map_err(|(b, e)| Error::backup(b.original.clone(), e))?;
    Ok(RecoverOutcome::Restored)
}
