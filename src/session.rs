//! Workflow session: the control-thread state machine.
//!
//! The session owns the navigator, the store, and the organized view, and is
//! the only thing that mutates them. Tool calls run on one worker thread;
//! their results come back through a completion queue that the owner drains
//! with [`Session::poll`] or [`Session::wait`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::clean::{CleanEvent, CleanOrchestrator};
use crate::error::{Error, Result};
use crate::labels::LabelLookup;
use crate::navigator::FileSetNavigator;
use crate::organizer::{organize, OrganizedMetadata};
use crate::policy;
use crate::store::MetadataStore;
use crate::tool::MetadataTool;
use crate::types::{CleanReport, CleanSummary};
use crate::value::{MetaValue, RawMetadata};

/// What the worker is doing on the session's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Idle,
    Loading,
    Saving,
    Cleaning,
}

/// State changes published to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    FilesChanged { count: usize },
    ActiveFileChanged { path: PathBuf, title: String },
    MetadataLoaded { path: PathBuf },
    LoadFailed { path: PathBuf, error: String },
    EditStaged { key: String, value: String },
    EditsDiscarded,
    Saved { path: PathBuf },
    SaveFailed { path: PathBuf, error: String },
    CleanProgress(CleanEvent),
    CleanFinished { summary: CleanSummary },
    ActivityChanged { activity: Activity },
}

enum Job {
    Load {
        generation: u64,
        path: PathBuf,
    },
    Save {
        generation: u64,
        path: PathBuf,
        edits: BTreeMap<String, String>,
    },
    Clean {
        files: Vec<PathBuf>,
    },
}

enum Completion {
    Loaded {
        generation: u64,
        path: PathBuf,
        result: Result<RawMetadata>,
    },
    Saved {
        generation: u64,
        path: PathBuf,
        result: Result<()>,
    },
    CleanProgress(CleanEvent),
    Cleaned(CleanReport),
}

type Observer = Box<dyn FnMut(&SessionEvent)>;

fn worker_loop(
    tool: Arc<dyn MetadataTool>,
    backup_suffix: String,
    jobs: Receiver<Job>,
    done: Sender<Completion>,
) {
    let orchestrator = CleanOrchestrator::new(Arc::clone(&tool)).with_backup_suffix(backup_suffix);

    // Ends when the session drops its sender
    while let Ok(job) = jobs.recv() {
        let completion = match job {
            Job::Load { generation, path } => Completion::Loaded {
                generation,
                result: tool.load_metadata(&path),
                path,
            },
            Job::Save {
                generation,
                path,
                edits,
            } => Completion::Saved {
                generation,
                result: tool.apply_edits(&path, &edits),
                path,
            },
            Job::Clean { files } => {
                let progress = done.clone();
                let report = orchestrator.run(&files, &mut |event| {
                    let _ = progress.send(Completion::CleanProgress(event.clone()));
                });
                Completion::Cleaned(report)
            }
        };
        if done.send(completion).is_err() {
            break;
        }
    }
    debug!("Worker stopped");
}

pub struct Session {
    labels: Arc<dyn LabelLookup>,
    navigator: FileSetNavigator,
    store: MetadataStore,
    organized: OrganizedMetadata,
    activity: Activity,
    /// Bumped whenever the active file changes; older loads are stale
    generation: u64,
    load_error: Option<String>,
    last_clean: Option<CleanReport>,
    jobs: Option<Sender<Job>>,
    completions: Receiver<Completion>,
    worker: Option<JoinHandle<()>>,
    observers: Vec<Observer>,
}

impl Session {
    pub fn new(
        tool: Arc<dyn MetadataTool>,
        labels: Arc<dyn LabelLookup>,
        backup_suffix: impl Into<String>,
    ) -> Self {
        let (job_tx, job_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();
        let backup_suffix = backup_suffix.into();

        let worker = thread::spawn(move || worker_loop(tool, backup_suffix, job_rx, done_tx));

        Session {
            labels,
            navigator: FileSetNavigator::new(),
            store: MetadataStore::new(),
            organized: OrganizedMetadata::default(),
            activity: Activity::Idle,
            generation: 0,
            load_error: None,
            last_clean: None,
            jobs: Some(job_tx),
            completions: done_rx,
            worker: Some(worker),
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&SessionEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn emit(&mut self, event: SessionEvent) {
        for observer in self.observers.iter_mut() {
            observer(&event);
        }
    }

    fn set_activity(&mut self, activity: Activity) {
        if self.activity != activity {
            self.activity = activity;
            self.emit(SessionEvent::ActivityChanged { activity });
        }
    }

    fn dispatch(&mut self, job: Job) -> Result<()> {
        let sender = self
            .jobs
            .as_ref()
            .ok_or_else(|| Error::InvocationFailure("background worker is not running".into()))?;
        sender
            .send(job)
            .map_err(|_| Error::InvocationFailure("background worker is not running".into()))
    }

    /// Navigation is allowed while a load is in flight (the new load
    /// supersedes it) but not while a save or clean is running.
    fn ensure_can_navigate(&self) -> Result<()> {
        match self.activity {
            Activity::Idle | Activity::Loading => Ok(()),
            Activity::Saving | Activity::Cleaning => Err(Error::Busy),
        }
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.activity == Activity::Idle {
            Ok(())
        } else {
            Err(Error::Busy)
        }
    }

    /// Clear per-file state and queue a load of the current file.
    fn activate_current(&mut self) -> Result<()> {
        let path = self.navigator.current()?.to_path_buf();
        self.generation += 1;
        self.store.load(RawMetadata::new());
        self.organized = OrganizedMetadata::default();
        self.load_error = None;

        let title = self.navigator.title().unwrap_or_default();
        self.emit(SessionEvent::ActiveFileChanged {
            path: path.clone(),
            title,
        });
        self.request_load(path)
    }

    /// Queue a load, or record the rejection when the policy refuses the
    /// file. A refused file never reaches the tool.
    fn request_load(&mut self, path: PathBuf) -> Result<()> {
        if let Err(e) = policy::check_supported(&path) {
            info!("Not loading {}: {}", path.display(), e);
            self.load_error = Some(e.to_string());
            self.set_activity(Activity::Idle);
            self.emit(SessionEvent::LoadFailed {
                path,
                error: e.to_string(),
            });
            return Ok(());
        }
        debug!("Loading {} (generation {})", path.display(), self.generation);
        self.dispatch(Job::Load {
            generation: self.generation,
            path,
        })?;
        self.set_activity(Activity::Loading);
        Ok(())
    }

    fn reorganize(&mut self) {
        self.organized = organize(&self.store.effective_metadata(), self.labels.as_ref());
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Replace the file set and start loading the first file.
    pub fn set_files(&mut self, files: Vec<PathBuf>) -> Result<()> {
        self.ensure_can_navigate()?;
        self.navigator.set_files(files)?;
        let count = self.navigator.len();
        self.emit(SessionEvent::FilesChanged { count });
        self.activate_current()
    }

    /// Move to the next file. Returns false at the end of the set.
    pub fn next(&mut self) -> Result<bool> {
        self.ensure_can_navigate()?;
        if !self.navigator.next() {
            return Ok(false);
        }
        self.activate_current()?;
        Ok(true)
    }

    /// Move to the previous file. Returns false at the start of the set.
    pub fn prev(&mut self) -> Result<bool> {
        self.ensure_can_navigate()?;
        if !self.navigator.prev() {
            return Ok(false);
        }
        self.activate_current()?;
        Ok(true)
    }

    pub fn stage(&mut self, key: &str, value: &str) -> Result<()> {
        self.ensure_idle()?;
        self.navigator.current()?;
        self.store.stage(key, value)?;
        self.reorganize();
        self.emit(SessionEvent::EditStaged {
            key: key.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    /// Write pending edits to the active file. Returns false when there was
    /// nothing to save.
    pub fn save(&mut self) -> Result<bool> {
        self.ensure_idle()?;
        let path = self.navigator.current()?.to_path_buf();
        if !self.store.has_pending_edits() {
            return Ok(false);
        }
        policy::check_supported(&path)?;
        let edits = self.store.writable_pending();
        info!("Saving {} edit(s) to {}", edits.len(), path.display());
        self.dispatch(Job::Save {
            generation: self.generation,
            path,
            edits,
        })?;
        self.set_activity(Activity::Saving);
        Ok(true)
    }

    /// Drop pending edits and reload the active file from disk.
    pub fn undo(&mut self) -> Result<()> {
        self.ensure_idle()?;
        let path = self.navigator.current()?.to_path_buf();
        self.store.discard_pending();
        self.reorganize();
        self.emit(SessionEvent::EditsDiscarded);
        self.request_load(path)
    }

    /// Strip metadata from every file in the set.
    pub fn clean(&mut self) -> Result<()> {
        self.ensure_idle()?;
        if self.navigator.is_empty() {
            return Err(Error::EmptySelection);
        }
        let files = self.navigator.files().to_vec();
        info!("Cleaning {} file(s)", files.len());
        self.dispatch(Job::Clean { files })?;
        self.set_activity(Activity::Cleaning);
        Ok(())
    }

    // ========================================================================
    // Completion queue
    // ========================================================================

    /// Apply every completion already queued. Returns how many were applied.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions.try_recv() {
            self.apply(completion);
            applied += 1;
        }
        applied
    }

    /// Block until the session is idle or `timeout` passes. Returns whether
    /// the session is idle.
    pub fn wait(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        while self.activity != Activity::Idle {
            let received = match deadline {
                Some(d) => self
                    .completions
                    .recv_timeout(d.saturating_duration_since(Instant::now())),
                None => self
                    .completions
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(completion) => self.apply(completion),
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("Worker disconnected while {:?}", self.activity);
                    self.set_activity(Activity::Idle);
                    return false;
                }
            }
        }
        true
    }

    fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::Loaded {
                generation,
                path,
                result,
            } => {
                if generation != self.generation {
                    debug!("Dropping stale load of {}", path.display());
                    return;
                }
                match result {
                    Ok(raw) => {
                        self.store.load(raw);
                        self.reorganize();
                        self.load_error = None;
                        self.set_activity(Activity::Idle);
                        self.emit(SessionEvent::MetadataLoaded { path });
                    }
                    Err(e) => {
                        warn!("Failed to load {}: {}", path.display(), e);
                        self.store.load(RawMetadata::new());
                        self.organized = OrganizedMetadata::default();
                        self.load_error = Some(e.to_string());
                        self.set_activity(Activity::Idle);
                        self.emit(SessionEvent::LoadFailed {
                            path,
                            error: e.to_string(),
                        });
                    }
                }
            }
            Completion::Saved {
                generation,
                path,
                result,
            } => match result {
                Ok(()) => {
                    self.emit(SessionEvent::Saved { path: path.clone() });
                    if generation == self.generation {
                        // Show what the tool actually wrote
                        if let Err(e) = self.request_load(path) {
                            warn!("Could not reload after save: {}", e);
                            self.set_activity(Activity::Idle);
                        }
                    } else {
                        self.set_activity(Activity::Idle);
                    }
                }
                Err(e) => {
                    warn!("Failed to save {}: {}", path.display(), e);
                    self.set_activity(Activity::Idle);
                    self.emit(SessionEvent::SaveFailed {
                        path,
                        error: e.to_string(),
                    });
                }
            },
            Completion::CleanProgress(event) => {
                self.emit(SessionEvent::CleanProgress(event));
            }
            Completion::Cleaned(report) => {
                let summary = report.summary.clone();
                self.last_clean = Some(report);
                self.set_activity(Activity::Idle);
                self.emit(SessionEvent::CleanFinished { summary });
                // The active file changed on disk
                if let Ok(path) = self.navigator.current().map(Path::to_path_buf) {
                    self.store.discard_pending();
                    if let Err(e) = self.request_load(path) {
                        warn!("Could not reload after clean: {}", e);
                    }
                }
            }
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn activity(&self) -> Activity {
        self.activity
    }

    pub fn is_busy(&self) -> bool {
        self.activity != Activity::Idle
    }

    pub fn navigator(&self) -> &FileSetNavigator {
        &self.navigator
    }

    pub fn current(&self) -> Result<&Path> {
        self.navigator.current()
    }

    pub fn title(&self) -> Option<String> {
        self.navigator.title()
    }

    pub fn organized(&self) -> &OrganizedMetadata {
        &self.organized
    }

    pub fn effective_value(&self, key: &str) -> Option<MetaValue> {
        self.store.effective_value(key)
    }

    pub fn has_pending_edits(&self) -> bool {
        self.store.has_pending_edits()
    }

    pub fn pending_edits(&self) -> &BTreeMap<String, String> {
        self.store.pending()
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn last_clean(&self) -> Option<&CleanReport> {
        self.last_clean.as_ref()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Closing the job channel stops the worker after its current job
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
