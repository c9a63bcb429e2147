//! Backup-guarded metadata stripping over a whole file set.
//!
//! Per file: `Pending -> BackingUp -> Stripping -> Cleaned`, or on a failed
//! strip `Stripping -> RestoringBackup -> Failed`. Files refused by the
//! supported-file policy go straight to `Skipped` without any tool call.
//! Files are processed one at a time, so at most one backup exists.

use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::backup::{self, Backup, RecoverOutcome, DEFAULT_BACKUP_SUFFIX};
use crate::error::{Error, Result};
use crate::policy;
use crate::tool::MetadataTool;
use crate::types::{
    CleanReport, CleanState, CleanSummary, FileOutcome, LogEntry, LogType, RecoverResult,
    RecoverSummary,
};

/// Progress notification for observers of a clean batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CleanEvent {
    Started { total: usize },
    StateChanged { index: usize, path: PathBuf, state: CleanState },
    Finished { summary: CleanSummary },
}

pub struct CleanOrchestrator {
    tool: Arc<dyn MetadataTool>,
    backup_suffix: String,
}

/// Stripped file must still be there and have content.
fn verify_stripped(path: &Path) -> Result<()> {
    let metadata = fs::metadata(path).map_err(|e| {
        Error::InvocationFailure(format!("{} is missing after strip: {}", path.display(), e))
    })?;
    if metadata.len() == 0 {
        return Err(Error::InvocationFailure(format!(
            "{} is empty after strip",
            path.display()
        )));
    }
    Ok(())
}

impl CleanOrchestrator {
    pub fn new(tool: Arc<dyn MetadataTool>) -> Self {
        CleanOrchestrator {
            tool,
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
        }
    }

    pub fn with_backup_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.backup_suffix = suffix.into();
        self
    }

    /// Clean every file in order. Per-file failures are recorded and the
    /// batch carries on.
    pub fn run(&self, files: &[PathBuf], observer: &mut dyn FnMut(&CleanEvent)) -> CleanReport {
        let started_at = Utc::now().to_rfc3339();
        observer(&CleanEvent::Started { total: files.len() });

        let mut logs = Vec::new();
        let mut summary = CleanSummary::default();
        let mut outcomes = Vec::with_capacity(files.len());

        for (index, path) in files.iter().enumerate() {
            let mut notify = |state: CleanState| {
                observer(&CleanEvent::StateChanged {
                    index,
                    path: path.clone(),
                    state,
                })
            };
            notify(CleanState::Pending);
            let outcome = self.clean_file(path, &mut notify);

            let display = path.display().to_string();
            match outcome.state {
                CleanState::Cleaned => {
                    summary.cleaned += 1;
                    logs.push(LogEntry::new(LogType::Success, format!("Cleaned: {}", display)));
                    if let Some(msg) = &outcome.message {
                        logs.push(
                            LogEntry::new(LogType::Warning, format!("Backup left behind: {}", display))
                                .with_details(msg.clone()),
                        );
                    }
                }
                CleanState::Skipped => {
                    summary.skipped += 1;
                    let mut entry = LogEntry::new(LogType::Warning, format!("Skipped: {}", display));
                    if let Some(msg) = &outcome.message {
                        entry = entry.with_details(msg.clone());
                    }
                    logs.push(entry);
                }
                _ => {
                    summary.failed += 1;
                    let mut entry = LogEntry::new(LogType::Error, format!("Failed: {}", display));
                    if let Some(msg) = &outcome.message {
                        entry = entry.with_details(msg.clone());
                    }
                    logs.push(entry);
                }
            }
            outcomes.push(outcome);
        }

        info!(
            "Clean finished: {} cleaned, {} skipped, {} failed",
            summary.cleaned, summary.skipped, summary.failed
        );
        observer(&CleanEvent::Finished {
            summary: summary.clone(),
        });

        CleanReport {
            logs,
            summary,
            outcomes,
            started_at,
            finished_at: Utc::now().to_rfc3339(),
        }
    }

    /// Drive one file to a terminal state, reporting each transition.
    pub fn clean_file(&self, path: &Path, notify: &mut dyn FnMut(CleanState)) -> FileOutcome {
        let finish = |state: CleanState, message: Option<String>| FileOutcome {
            path: path.to_path_buf(),
            state,
            message,
        };

        if let Err(e) = policy::check_supported(path) {
            info!("Skipping {}: {}", path.display(), e);
            notify(CleanState::Skipped);
            return finish(CleanState::Skipped, Some(e.to_string()));
        }

        notify(CleanState::BackingUp);
        let backup = match Backup::create(path, &self.backup_suffix) {
            Ok(b) => b,
            Err(e) => {
                error!("{}", e);
                notify(CleanState::Failed);
                return finish(CleanState::Failed, Some(e.to_string()));
            }
        };

        notify(CleanState::Stripping);
        let stripped = self
            .tool
            .strip_all_metadata(path)
            .and_then(|_| verify_stripped(path));

        match stripped {
            Ok(()) => {
                let leftover = backup.path().to_path_buf();
                let message = match backup.discard() {
                    Ok(()) => None,
                    Err(e) => {
                        // Restoring this copy would bring the old metadata back
                        warn!("Cleaned {} but could not remove backup: {}", path.display(), e);
                        Some(format!(
                            "backup could not be removed ({}); delete {} by hand, it still holds the original metadata",
                            e,
                            leftover.display()
                        ))
                    }
                };
                info!("Cleaned {}", path.display());
                notify(CleanState::Cleaned);
                finish(CleanState::Cleaned, message)
            }
            Err(strip_err) => {
                warn!("Strip failed for {}: {}", path.display(), strip_err);
                notify(CleanState::RestoringBackup);
                let message = match backup.restore() {
                    Ok(()) => format!("{} (original restored)", strip_err),
                    Err((kept, restore_err)) => {
                        error!(
                            "Could not restore {}: {}; original kept at {}",
                            path.display(),
                            restore_err,
                            kept.path().display()
                        );
                        format!(
                            "{}; restore failed ({}), original kept at {}",
                            strip_err,
                            restore_err,
                            kept.path().display()
                        )
                    }
                };
                notify(CleanState::Failed);
                finish(CleanState::Failed, Some(message))
            }
        }
    }

    /// Put back originals from backups left by an interrupted clean.
    pub fn recover(&self, paths: &[PathBuf]) -> RecoverResult {
        let mut logs = Vec::new();
        let mut summary = RecoverSummary::default();

        for path in paths {
            match backup::recover(path, &self.backup_suffix) {
                Ok(RecoverOutcome::Restored) => {
                    summary.restored += 1;
                    logs.push(LogEntry::new(
                        LogType::Success,
                        format!("Restored: {}", path.display()),
                    ));
                }
                Ok(RecoverOutcome::NoBackup) => {
                    summary.no_backup += 1;
                    logs.push(LogEntry::new(
                        LogType::Info,
                        format!("No backup: {}", path.display()),
                    ));
                }
                Err(e) => {
                    summary.errors += 1;
                    logs.push(
                        LogEntry::new(LogType::Error, format!("Failed: {}", path.display()))
                            .with_details(e.to_string()),
                    );
                }
            }
        }

        RecoverResult { logs, summary }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::backup_path;
    use crate::value::RawMetadata;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    /// Strips by rewriting the file, or fails after corrupting it.
    struct ScriptedTool {
        fail: bool,
    }

    impl MetadataTool for ScriptedTool {
        fn probe_available(&self) -> Result<String> {
            Ok("test".into())
        }

        fn load_metadata(&self, _path: &Path) -> Result<RawMetadata> {
            Ok(RawMetadata::new())
        }

        fn apply_edits(&self, _path: &Path, _edits: &BTreeMap<String, String>) -> Result<()> {
            Ok(())
        }

        fn strip_all_metadata(&self, path: &Path) -> Result<()> {
            if self.fail {
                fs::write(path, b"garbage").unwrap();
                Err(Error::InvocationFailure("Error: corrupt file".into()))
            } else {
                fs::write(path, b"stripped").unwrap();
                Ok(())
            }
        }
    }

    fn orchestrator(fail: bool) -> CleanOrchestrator {
        CleanOrchestrator::new(Arc::new(ScriptedTool { fail }))
    }

    #[test]
    fn test_successful_strip_removes_backup() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.jpg");
        fs::write(&file, b"with metadata").unwrap();

        let mut states = Vec::new();
        let outcome = orchestrator(false).clean_file(&file, &mut |s| states.push(s));

        assert_eq!(outcome.state, CleanState::Cleaned);
        assert_eq!(fs::read(&file).unwrap(), b"stripped");
        assert!(!backup_path(&file, DEFAULT_BACKUP_SUFFIX).exists());
        assert_eq!(
            states,
            vec![CleanState::BackingUp, CleanState::Stripping, CleanState::Cleaned]
        );
    }

    #[test]
    fn test_failed_strip_restores_original() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.jpg");
        fs::write(&file, b"with metadata").unwrap();

        let mut states = Vec::new();
        let outcome = orchestrator(true).clean_file(&file, &mut |s| states.push(s));

        assert_eq!(outcome.state, CleanState::Failed);
        assert_eq!(fs::read(&file).unwrap(), b"with metadata");
        assert!(!backup_path(&file, DEFAULT_BACKUP_SUFFIX).exists());
        assert!(outcome.message.unwrap().contains("corrupt file"));
        assert_eq!(
            states,
            vec![
                CleanState::BackingUp,
                CleanState::Stripping,
                CleanState::RestoringBackup,
                CleanState::Failed
            ]
        );
    }

    #[test]
    fn test_empty_result_counts_as_failure() {
        struct Truncating;
        impl MetadataTool for Truncating {
            fn probe_available(&self) -> Result<String> {
                Ok("test".into())
            }
            fn load_metadata(&self, _path: &Path) -> Result<RawMetadata> {
                Ok(RawMetadata::new())
            }
            fn apply_edits(&self, _: &Path, _: &BTreeMap<String, String>) -> Result<()> {
                Ok(())
            }
            fn strip_all_metadata(&self, path: &Path) -> Result<()> {
                fs::write(path, b"").unwrap();
                Ok(())
            }
        }

        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.jpg");
        fs::write(&file, b"with metadata").unwrap();

        let outcome = CleanOrchestrator::new(Arc::new(Truncating)).clean_file(&file, &mut |_| {});
        assert_eq!(outcome.state, CleanState::Failed);
        assert_eq!(fs::read(&file).unwrap(), b"with metadata");
    }

    #[cfg(unix)]
    #[test]
    fn test_undeletable_backup_is_reported() {
        /// Strips, but leaves a directory where the backup file was.
        struct BackupBlocker;
        impl MetadataTool for BackupBlocker {
            fn probe_available(&self) -> Result<String> {
                Ok("test".into())
            }
            fn load_metadata(&self, _path: &Path) -> Result<RawMetadata> {
                Ok(RawMetadata::new())
            }
            fn apply_edits(&self, _: &Path, _: &BTreeMap<String, String>) -> Result<()> {
                Ok(())
            }
            fn strip_all_metadata(&self, path: &Path) -> Result<()> {
                let bak = backup_path(path, DEFAULT_BACKUP_SUFFIX);
                fs::remove_file(&bak).unwrap();
                fs::create_dir(&bak).unwrap();
                fs::write(path, b"stripped").unwrap();
                Ok(())
            }
        }

        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.jpg");
        fs::write(&file, b"with metadata").unwrap();
        let bak = backup_path(&file, DEFAULT_BACKUP_SUFFIX);

        let report = CleanOrchestrator::new(Arc::new(BackupBlocker)).run(&[file.clone()], &mut |_| {});

        let outcome = report.outcome_for(&file).unwrap();
        assert_eq!(outcome.state, CleanState::Cleaned);
        let message = outcome.message.as_deref().unwrap();
        assert!(message.contains(&bak.display().to_string()));
        assert!(message.contains("delete"));
        assert!(!message.contains("recover"));
        assert!(report
            .logs
            .iter()
            .any(|l| l.log_type == LogType::Warning && l.message.contains("Backup left behind")));
        assert_eq!(report.summary.cleaned, 1);
    }

    #[test]
    fn test_denied_file_is_skipped_untouched() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("setup.exe");
        fs::write(&file, b"MZ program").unwrap();

        let outcome = orchestrator(false).clean_file(&file, &mut |_| {});
        assert_eq!(outcome.state, CleanState::Skipped);
        assert_eq!(fs::read(&file).unwrap(), b"MZ program");
        assert!(!backup_path(&file, DEFAULT_BACKUP_SUFFIX).exists());
    }

    #[test]
    fn test_stale_backup_blocks_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.jpg");
        fs::write(&file, b"current").unwrap();
        let bak = backup_path(&file, DEFAULT_BACKUP_SUFFIX);
        fs::write(&bak, b"older").unwrap();

        let outcome = orchestrator(false).clean_file(&file, &mut |_| {});
        assert_eq!(outcome.state, CleanState::Failed);
        assert!(outcome.message.unwrap().contains("recover"));
        assert_eq!(fs::read(&file).unwrap(), b"current");
        assert_eq!(fs::read(&bak).unwrap(), b"older");
    }

    #[test]
    fn test_batch_summary_and_events() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.jpg");
        let b = temp.path().join("b.lnk");
        let c = temp.path().join("c.png");
        for f in [&a, &b, &c] {
            fs::write(f, b"data").unwrap();
        }

        let mut events = Vec::new();
        let report = orchestrator(false).run(&[a, b.clone(), c], &mut |e| events.push(e.clone()));

        assert_eq!(
            report.summary,
            CleanSummary {
                cleaned: 2,
                skipped: 1,
                failed: 0
            }
        );
        assert_eq!(fs::read(&b).unwrap(), b"data");
        assert_eq!(report.outcome_for(&b).unwrap().state, CleanState::Skipped);
        assert_eq!(events.first(), Some(&CleanEvent::Started { total: 3 }));
        assert!(matches!(events.last(), Some(CleanEvent::Finished { .. })));
        assert!(chrono::DateTime::parse_from_rfc3339(&report.started_at).is_ok());
    }

    #[test]
    fn test_recover_batch() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.jpg");
        let b = temp.path().join("b.jpg");
        fs::write(&a, b"broken").unwrap();
        fs::write(backup_path(&a, DEFAULT_BACKUP_SUFFIX), b"original").unwrap();
        fs::write(&b, b"fine").unwrap();

        let result = orchestrator(false).recover(&[a.clone(), b]);
        assert_eq!(result.summary.restored, 1);
        assert_eq!(result.summary.no_backup, 1);
        assert_eq!(fs::read(&a).unwrap(), b"original");
    }
}
