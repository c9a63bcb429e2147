//! Error types for the metadata workflow.
//!
//! Every failure at the subprocess boundary is converted into one of these
//! kinds before it reaches the control thread. The kind, not the message,
//! decides what the caller does next (see [`Error::severity`]).

use std::path::PathBuf;
use thiserror::Error;

/// Convenience Result type
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The metadata tool could not be started at all
    #[error("ExifTool is not available: {0}")]
    ToolUnavailable(String),

    /// The file was rejected by the supported-file policy before any tool call
    #[error("Unsupported file type: {path}: {reason}")]
    UnsupportedFileType { path: PathBuf, reason: String },

    /// The tool ran (or tried to) and failed; carries its diagnostic text
    #[error("ExifTool failed: {0}")]
    InvocationFailure(String),

    /// The tool's output did not have the expected structure
    #[error("Could not parse ExifTool output: {0}")]
    ParseFailure(String),

    /// The pre-strip snapshot could not be created
    #[error("Backup failed for {path}: {reason}")]
    BackupFailure { path: PathBuf, reason: String },

    /// A file set was replaced with nothing
    #[error("No files selected")]
    EmptySelection,

    /// A file-scoped operation was requested with no active file
    #[error("No active file")]
    NoActiveFile,

    /// Edit targets a key that is neither loaded nor a known writable tag
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Another operation is still in flight
    #[error("Another operation is in progress")]
    Busy,

    /// Configuration or label file problems
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// How far a failure reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The same request may succeed later or after the user adjusts input
    Retryable,
    /// This file is done for; the rest of the workflow continues
    FatalForFile,
    /// Nothing can proceed until the user fixes the environment
    FatalForWorkflow,
}

impl Error {
    pub fn severity(&self) -> Severity {
        match self {
            Error::ToolUnavailable(_) | Error::Config(_) => Severity::FatalForWorkflow,
            Error::UnsupportedFileType { .. }
            | Error::BackupFailure { .. }
            | Error::InvocationFailure(_)
            | Error::ParseFailure(_) => Severity::FatalForFile,
            Error::EmptySelection
            | Error::NoActiveFile
            | Error::UnknownField(_)
            | Error::Busy
            | Error::Io(_) => Severity::Retryable,
        }
    }

    pub(crate) fn backup(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Error::BackupFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_missing_blocks_workflow() {
        let err = Error::ToolUnavailable("not found".to_string());
        assert_eq!(err.severity(), Severity::FatalForWorkflow);
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_per_file_failures_do_not_block_workflow() {
        assert_eq!(
            Error::InvocationFailure("exit 1".into()).severity(),
            Severity::FatalForFile
        );
        assert_eq!(
            Error::backup("/tmp/a.jpg", "disk full").severity(),
            Severity::FatalForFile
        );
    }

    #[test]
    fn test_selection_errors_are_retryable() {
        assert_eq!(Error::EmptySelection.severity(), Severity::Retryable);
        assert_eq!(Error::NoActiveFile.severity(), Severity::Retryable);
    }

    #[test]
    fn test_message_keeps_diagnostic_text() {
        let err = Error::InvocationFailure("Error: File not found - x.jpg".into());
        assert_eq!(err.to_string(), "ExifTool failed: Error: File not found - x.jpg");
    }
}
