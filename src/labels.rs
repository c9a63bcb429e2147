//! Human-readable labels for raw tag names.
//!
//! Labels come from a TOML file of sections, each a table of
//! `key = "label"` pairs:
//!
//! ```toml
//! [KEYS]
//! Make = "Camera maker"
//! GPSLatitude = "Latitude"
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};

/// Section used for field display keys
pub const KEYS_SECTION: &str = "KEYS";

pub trait LabelLookup: Send + Sync {
    fn label(&self, section: &str, key: &str) -> Option<String>;

    /// Label for `key`, or `fallback` when none is defined.
    fn label_or(&self, section: &str, key: &str, fallback: &str) -> String {
        self.label(section, key)
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Lookup that never has a label; raw keys are shown as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLabels;

impl LabelLookup for NoLabels {
    fn label(&self, _section: &str, _key: &str) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct LabelFile {
    sections: HashMap<String, HashMap<String, String>>,
}

impl LabelFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read label file {}: {}", path.display(), e))
        })?;
        let labels = Self::parse(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        debug!(
            "Loaded {} label sections from {}",
            labels.sections.len(),
            path.display()
        );
        Ok(labels)
    }

    pub fn parse(content: &str) -> std::result::Result<Self, String> {
        let sections: HashMap<String, HashMap<String, String>> =
            toml::from_str(content).map_err(|e| format!("Invalid label file: {}", e))?;
        Ok(LabelFile { sections })
    }
}

impl LabelLookup for LabelFile {
    fn label(&self, section: &str, key: &str) -> Option<String> {
        self.sections.get(section)?.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_no_labels_falls_back() {
        assert_eq!(NoLabels.label_or(KEYS_SECTION, "Make", "Make"), "Make");
    }

    #[test]
    fn test_label_file_lookup() {
        let labels = LabelFile::parse(
            r#"
[KEYS]
Make = "Camera maker"

[GROUPS]
EXIF = "Camera data"
"#,
        )
        .unwrap();

        assert_eq!(labels.label(KEYS_SECTION, "Make").as_deref(), Some("Camera maker"));
        assert_eq!(labels.label("GROUPS", "EXIF").as_deref(), Some("Camera data"));
        assert_eq!(labels.label(KEYS_SECTION, "Model"), None);
        assert_eq!(labels.label("MISSING", "Make"), None);
    }

    #[test]
    fn test_label_file_rejects_non_table_sections() {
        assert!(LabelFile::parse("KEYS = 3").is_err());
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        let err = LabelFile::load(&temp.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
