//! Report and log types shared by the clean batch, recovery, and the CLI.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Log Types
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub log_type: LogType,
    pub message: String,
    pub details: Option<String>,
}

impl LogEntry {
    pub fn new(log_type: LogType, message: impl Into<String>) -> Self {
        LogEntry {
            log_type,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

// ============================================================================
// Clean Types
// ============================================================================

/// Per-file position in the clean state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CleanState {
    Pending,
    BackingUp,
    Stripping,
    RestoringBackup,
    /// Terminal: metadata stripped and backup removed
    Cleaned,
    /// Terminal: original content is back in place (or kept in the backup)
    Failed,
    /// Terminal: refused by the supported-file policy, never touched
    Skipped,
}

impl CleanState {
    pub fn is_terminal(self) -> bool {
        matches!(self, CleanState::Cleaned | CleanState::Failed | CleanState::Skipped)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub state: CleanState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CleanSummary {
    pub cleaned: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanReport {
    pub logs: Vec<LogEntry>,
    pub summary: CleanSummary,
    pub outcomes: Vec<FileOutcome>,
    /// RFC 3339
    pub started_at: String,
    /// RFC 3339
    pub finished_at: String,
}

impl CleanReport {
    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0
    }

    pub fn outcome_for(&self, path: &std::path::Path) -> Option<&FileOutcome> {
        self.outcomes.iter().find(|o| o.path == path)
    }
}

// ============================================================================
// Recovery Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoverResult {
    pub logs: Vec<LogEntry>,
    pub summary: RecoverSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecoverSummary {
    pub restored: usize,
    pub no_backup: usize,
    pub errors: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(CleanState::Cleaned.is_terminal());
        assert!(CleanState::Failed.is_terminal());
        assert!(CleanState::Skipped.is_terminal());
        assert!(!CleanState::Stripping.is_terminal());
        assert!(!CleanState::RestoringBackup.is_terminal());
    }

    #[test]
    fn test_log_entry_serializes_lowercase_type() {
        let entry = LogEntry::new(LogType::Warning, "careful").with_details("more");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["log_type"], "warning");
        assert_eq!(json["details"], "more");
    }

    #[test]
    fn test_clean_state_serializes_snake_case() {
        let json = serde_json::to_string(&CleanState::RestoringBackup).unwrap();
        assert_eq!(json, "\"restoring_backup\"");
    }
}
