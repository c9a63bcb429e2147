//! Supported-file policy.
//!
//! Shortcuts, executables, system libraries, and scripts are refused before
//! the metadata tool is ever invoked. Everything else is provisionally
//! accepted; the tool reports if it cannot process a file.

use std::path::Path;

use crate::error::{Error, Result};

/// Extensions (lowercase, without the dot) that are never processed
pub const DENIED_EXTENSIONS: &[&str] = &["lnk", "url", "desktop", "exe", "dll", "sys", "bat", "cmd"];

/// MIME types that are never processed
pub const DENIED_MIME_TYPES: &[&str] = &[
    "application/x-ms-shortcut",
    "application/x-msdownload",
    "application/vnd.microsoft.portable-executable",
    "application/x-executable",
];

/// Check whether a file may be handed to the metadata tool.
///
/// The extension is checked first; if it passes, the file's leading bytes
/// are sniffed so a renamed executable is still refused. A file that cannot
/// be read for sniffing is accepted here and left for the tool to report.
pub fn check_supported(path: &Path) -> Result<()> {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        let ext = ext.to_ascii_lowercase();
        if DENIED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(Error::UnsupportedFileType {
                path: path.to_path_buf(),
                reason: format!("'.{}' files are not supported for metadata cleaning", ext),
            });
        }
    }

    if let Ok(Some(kind)) = infer::get_from_path(path) {
        let mime = kind.mime_type();
        if DENIED_MIME_TYPES.contains(&mime) {
            return Err(Error::UnsupportedFileType {
                path: path.to_path_buf(),
                reason: format!("'{}' content is not supported", mime),
            });
        }
    }

    Ok(())
}

pub fn is_supported(path: &Path) -> bool {
    check_supported(path).is_ok()
}
