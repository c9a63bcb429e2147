//! Ordered file set with a cursor.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct FileSetNavigator {
    files: Vec<PathBuf>,
    index: usize,
}

impl FileSetNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole set and point at the first file.
    ///
    /// An empty list is refused and leaves the current set untouched.
    pub fn set_files(&mut self, files: Vec<PathBuf>) -> Result<()> {
        if files.is_empty() {
            return Err(Error::EmptySelection);
        }
        self.files = files;
        self.index = 0;
        Ok(())
    }

    /// Move forward; returns false (and does nothing) at the last file.
    pub fn next(&mut self) -> bool {
        if self.index + 1 < self.files.len() {
            self.index += 1;
            true
        } else {
            false
        }
    }

    /// Move back; returns false (and does nothing) at the first file.
    pub fn prev(&mut self) -> bool {
        if self.index > 0 {
            self.index -= 1;
            true
        } else {
            false
        }
    }

    pub fn current(&self) -> Result<&Path> {
        self.files
            .get(self.index)
            .map(PathBuf::as_path)
            .ok_or(Error::NoActiveFile)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// 1-based position and total, for "name (i/n)" titles
    pub fn position(&self) -> Option<(usize, usize)> {
        if self.files.is_empty() {
            None
        } else {
            Some((self.index + 1, self.files.len()))
        }
    }

    pub fn has_next(&self) -> bool {
        self.index + 1 < self.files.len()
    }

    pub fn has_prev(&self) -> bool {
        self.index > 0
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Title for the active file, e.g. `photo.jpg (2/5)`
    pub fn title(&self) -> Option<String> {
        let current = self.current().ok()?;
        let (i, n) = self.position()?;
        let name = current
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| current.display().to_string());
        Some(format!("{} ({}/{})", name, i, n))
    }
}
