//! Gateway to the external ExifTool process.
//!
//! Argument vectors are built element by element and handed to
//! [`Command::args`]; nothing is ever passed through a shell.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::tags;
use crate::value::RawMetadata;

/// Program name looked up on PATH when none is configured
pub const DEFAULT_PROGRAM: &str = "exiftool";

/// Per-invocation limit when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Tags kept by a strip so the file still describes itself correctly
const STRUCTURAL_TAGS: &[&str] = &["-FileType", "-FileTypeExtension", "-MIMEType", "-ImageSize"];

/// Operations the workflow needs from a metadata tool.
pub trait MetadataTool: Send + Sync {
    /// Version string of a working installation
    fn probe_available(&self) -> Result<String>;

    fn load_metadata(&self, path: &Path) -> Result<RawMetadata>;

    /// Write `edits` (`Group:Tag` -> value) into the file in place.
    fn apply_edits(&self, path: &Path, edits: &BTreeMap<String, String>) -> Result<()>;

    /// Remove all metadata except the structural tags.
    fn strip_all_metadata(&self, path: &Path) -> Result<()>;
}

// ============================================================================
// Argument construction
// ============================================================================

/// Path as a single argument. A relative path starting with `-` gets a
/// `./` prefix so it cannot be taken for an option.
pub fn path_arg(path: &Path) -> OsString {
    if path.is_relative() && path.as_os_str().to_string_lossy().starts_with('-') {
        Path::new(".").join(path).into_os_string()
    } else {
        path.as_os_str().to_os_string()
    }
}

pub fn probe_args() -> Vec<OsString> {
    vec!["-ver".into()]
}

pub fn read_args(path: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-json",
        "-G",
        "-struct",
        "-duplicates",
        "-unknown",
        "-charset",
        "filename=utf8",
        "-charset",
        "utf8",
    ]
    .iter()
    .map(OsString::from)
    .collect();
    args.push(path_arg(path));
    args
}

/// Arguments for writing `edits`, or `None` when nothing writable remains
/// after read-only groups are dropped.
pub fn apply_args(path: &Path, edits: &BTreeMap<String, String>) -> Option<Vec<OsString>> {
    let assignments: Vec<OsString> = edits
        .iter()
        .filter(|(key, _)| !tags::is_read_only_key(key))
        .map(|(key, value)| OsString::from(format!("-{}={}", tags::write_name(key), value)))
        .collect();

    if assignments.is_empty() {
        return None;
    }

    let mut args = vec![OsString::from("-overwrite_original")];
    args.extend(assignments);
    args.push(path_arg(path));
    Some(args)
}

pub fn strip_args(path: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-all=".into(), "-tagsFromFile".into(), "@".into()];
    args.extend(STRUCTURAL_TAGS.iter().map(OsString::from));
    args.push("-overwrite_original".into());
    args.push("-P".into());
    args.push(path_arg(path));
    args
}

/// Decode `-json` output for exactly one file.
pub fn parse_read_output(stdout: &[u8]) -> Result<RawMetadata> {
    let mut records: Vec<RawMetadata> = serde_json::from_slice(stdout)
        .map_err(|e| Error::ParseFailure(format!("invalid JSON: {}", e)))?;
    if records.len() != 1 {
        return Err(Error::ParseFailure(format!(
            "expected metadata for 1 file, got {}",
            records.len()
        )));
    }
    Ok(records.remove(0))
}

// ============================================================================
// Process execution
// ============================================================================

struct ToolOutput {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: String,
}

impl ToolOutput {
    /// Diagnostic text for a failed run
    fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = String::from_utf8_lossy(&self.stdout);
        let stdout = stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match self.status.code() {
            Some(code) => format!("exited with status {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Kill a child that is being given up on and reap it.
fn abandon(child: &mut Child, reason: String) -> Error {
    let _ = child.kill();
    let _ = child.wait();
    Error::InvocationFailure(reason)
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

/// ExifTool invoked as a subprocess.
#[derive(Debug, Clone)]
pub struct ExifTool {
    program: PathBuf,
    timeout: Duration,
}

impl Default for ExifTool {
    fn default() -> Self {
        ExifTool {
            program: PathBuf::from(DEFAULT_PROGRAM),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ExifTool {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        ExifTool {
            program: program.into(),
            timeout,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn run(&self, args: &[OsString]) -> Result<ToolOutput> {
        debug!("Running {} {:?}", self.program.display(), args);

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::InvocationFailure(format!(
                    "could not start {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        // Drain both pipes while waiting so a chatty child cannot block on a full pipe
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        // No deadline when the timeout is too large to represent
        let deadline = Instant::now().checked_add(self.timeout);
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    return Err(abandon(
                        &mut child,
                        format!("could not wait for {}: {}", self.program.display(), e),
                    ));
                }
            }
            if matches!(deadline, Some(d) if Instant::now() >= d) {
                warn!(
                    "{} exceeded {}s, killing it",
                    self.program.display(),
                    self.timeout.as_secs()
                );
                return Err(abandon(
                    &mut child,
                    format!("timed out after {} seconds", self.timeout.as_secs()),
                ));
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stdout = stdout.and_then(|h| h.join().ok()).unwrap_or_default();
        let stderr = stderr.and_then(|h| h.join().ok()).unwrap_or_default();

        Ok(ToolOutput {
            status,
            stdout,
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }

    /// Run and require a zero exit status.
    fn run_checked(&self, args: &[OsString]) -> Result<ToolOutput> {
        let output = self.run(args)?;
        if !output.status.success() {
            return Err(Error::InvocationFailure(output.diagnostic()));
        }
        let warnings = output.stderr.trim();
        if !warnings.is_empty() {
            warn!("{}", warnings);
        }
        Ok(output)
    }
}

impl MetadataTool for ExifTool {
    fn probe_available(&self) -> Result<String> {
        let output = self
            .run_checked(&probe_args())
            .map_err(|e| match e {
                Error::InvocationFailure(msg) => Error::ToolUnavailable(msg),
                other => Error::ToolUnavailable(other.to_string()),
            })?;
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if version.is_empty() {
            return Err(Error::ToolUnavailable(format!(
                "{} printed no version",
                self.program.display()
            )));
        }
        Ok(version)
    }

    fn load_metadata(&self, path: &Path) -> Result<RawMetadata> {
        let output = self.run_checked(&read_args(path))?;
        parse_read_output(&output.stdout)
    }

    fn apply_edits(&self, path: &Path, edits: &BTreeMap<String, String>) -> Result<()> {
        match apply_args(path, edits) {
            Some(args) => self.run_checked(&args).map(|_| ()),
            None => {
                debug!("No writable edits for {}", path.display());
                Ok(())
            }
        }
    }

    fn strip_all_metadata(&self, path: &Path) -> Result<()> {
        self.run_checked(&strip_args(path)).map(|_| ())
    }
}
