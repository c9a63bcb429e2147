//! CLI interface for metaclean
//!
//! Inspect, edit, and strip embedded metadata from media files from the
//! command line or a script.

use clap::{ArgAction, Parser, Subcommand};
use metaclean_lib::{
    clean::CleanEvent, tags, tool, CleanOrchestrator, CleanReport, CleanState, Config,
    ConfigOverrides, Error, FieldGroup, LabelFile, LabelLookup, LogEntry, LogType, MetadataStore,
    MetadataTool, NoLabels, OrganizedMetadata, RecoverResult, Session, SessionEvent,
};
use metaclean_lib::policy;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// Exit codes with clear semantics
mod exit_codes {
    /// Operation completed successfully
    pub const SUCCESS: i32 = 0;
    /// Operation failed
    pub const ERROR: i32 = 1;
    /// Invalid usage or arguments
    pub const USAGE_ERROR: i32 = 2;
}

/// Column width for field names in metadata listings
const KEY_WIDTH: usize = 28;

/// Extra time allowed on top of the tool timeout when waiting for a load
const WAIT_MARGIN: Duration = Duration::from_secs(5);

/// metaclean - view, edit, and remove metadata from photos, videos, audio and documents
#[derive(Parser)]
#[command(name = "metaclean")]
#[command(author, version, about)]
#[command(after_help = "\
EXAMPLES:
    Check that ExifTool is installed:
        metaclean check

    Show grouped metadata for some photos:
        metaclean show IMG_0001.jpg IMG_0002.jpg

    Change the camera maker and add an artist:
        metaclean edit photo.jpg --set EXIF:Make=Canon --set EXIF:Artist=\"Jane Doe\"

    Preview the ExifTool command an edit would run:
        metaclean edit photo.jpg --set XMP:Title=Holiday --dry-run

    Strip all metadata (a backup guards each file while it is rewritten):
        metaclean clean *.jpg --yes

    Restore originals left behind by an interrupted clean:
        metaclean recover *.jpg

    Walk through files interactively:
        metaclean browse *.jpg
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the exiftool executable
    #[arg(long, global = true, value_name = "PATH")]
    exiftool: Option<PathBuf>,

    /// Seconds before a single ExifTool call is abandoned
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    /// TOML file with display labels for field names
    #[arg(long, global = true, value_name = "FILE")]
    labels: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// More log output (repeat for more)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that ExifTool can be run and print its version
    Check,

    /// Show grouped metadata for one or more files
    Show {
        /// Files to inspect
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change metadata fields of a file
    Edit {
        /// File to edit
        file: PathBuf,

        /// Field assignments (can be used multiple times)
        /// Format: Group:Tag=value
        #[arg(long = "set", value_parser = parse_assignment, required = true)]
        assignments: Vec<(String, String)>,

        /// Print the ExifTool arguments without running them
        #[arg(long)]
        dry_run: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove all metadata except file type and image size
    Clean {
        /// Files to clean
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Skip confirmation
        #[arg(long)]
        yes: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Restore originals from backups left by an interrupted clean
    Recover {
        /// Files whose backups should be restored
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Step through files interactively, reading commands from stdin
    Browse {
        /// Files to browse
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// CLI execution result
enum CliResult {
    Success,
    Error(String),
    UsageError(String),
}

macro_rules! status {
    ($quiet:expr, $($arg:tt)*) => {
        if !$quiet {
            eprintln!($($arg)*);
        }
    };
}

/// Everything a command needs after global flags are resolved
struct Context {
    config: Config,
    tool: Arc<dyn MetadataTool>,
    labels: Arc<dyn LabelLookup>,
    quiet: bool,
}

impl Context {
    /// How long to wait for one load or save round trip
    fn load_wait(&self) -> Duration {
        self.config
            .timeout
            .saturating_mul(2)
            .saturating_add(WAIT_MARGIN)
    }

    /// Fail early when the tool cannot run at all.
    fn require_tool(&self) -> Result<String, CliResult> {
        self.tool
            .probe_available()
            .map_err(|e| CliResult::Error(e.to_string()))
    }
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (raw_key, value) = match s.split_once('=') {
        Some(parts) => parts,
        None => {
            return Err(format!(
                "Invalid assignment: '{}'. Expected Group:Tag=value",
                s
            ))
        }
    };

    let key = raw_key.trim();
    if key.is_empty() {
        return Err("Field name cannot be empty".to_string());
    }
    if !tags::is_valid_key(key) {
        return Err(format!(
            "Invalid field '{}'. Use the Group:Tag form shown by 'metaclean show', e.g. EXIF:Artist",
            key
        ));
    }

    Ok((key.to_string(), value.to_string()))
}

/// Pad a string to a fixed character width (not byte width).
fn pad_to_width(s: &str, width: usize) -> String {
    let char_count = s.chars().count();
    if char_count >= width {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(width - char_count))
    }
}

/// Quote an argument for display so a printed command can be pasted into a shell.
fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_=:./@,+%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

fn log_filter(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_filter(verbose, quiet)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_context(cli: &Cli) -> Result<Context, CliResult> {
    let overrides = ConfigOverrides {
        exiftool: cli.exiftool.clone(),
        timeout_secs: cli.timeout,
        labels: cli.labels.clone(),
    };
    let config = Config::load(&overrides).map_err(|e| CliResult::UsageError(e.to_string()))?;

    let labels: Arc<dyn LabelLookup> = match &config.labels {
        Some(path) => Arc::new(LabelFile::load(path).map_err(|e| CliResult::UsageError(e.to_string()))?),
        None => Arc::new(NoLabels),
    };

    Ok(Context {
        tool: Arc::new(config.tool()),
        config,
        labels,
        quiet: cli.quiet,
    })
}

fn print_json<T: Serialize>(value: &T, what: &str) -> CliResult {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            CliResult::Success
        }
        Err(e) => CliResult::Error(format!("Failed to serialize {}: {}", what, e)),
    }
}

fn print_logs(logs: &[LogEntry]) {
    for log in logs {
        let prefix = match log.log_type {
            LogType::Success => "+",
            LogType::Error => "!",
            LogType::Warning => "?",
            LogType::Info => "~",
        };

        eprintln!("  {} {}", prefix, log.message);
        if let Some(details) = &log.details {
            if log.log_type != LogType::Success {
                eprintln!("    {}", details);
            }
        }
    }
}

/// Metadata listing is primary data output and goes to stdout
fn print_organized(title: &str, organized: &OrganizedMetadata) {
    println!("{}", title);
    if organized.groups.is_empty() {
        println!("  (no metadata)");
        return;
    }
    for group in &organized.groups {
        print_group(group);
    }
}

fn print_group(group: &FieldGroup) {
    let marker = if group.read_only { " (read-only)" } else { "" };
    println!("  {} [{}]{}", group.title, group.name, marker);
    let continuation = " ".repeat(KEY_WIDTH + 5);
    for entry in &group.entries {
        let mut lines = entry.display_value.lines();
        let first = lines.next().unwrap_or("");
        println!("    {} {}", pad_to_width(&entry.display_key, KEY_WIDTH), first);
        for line in lines {
            println!("{}{}", continuation, line);
        }
    }
}

fn print_clean_report(report: &CleanReport, json_output: bool, quiet: bool) -> CliResult {
    if json_output {
        if let CliResult::Error(e) = print_json(report, "report") {
            return CliResult::Error(e);
        }
    } else if !quiet {
        print_logs(&report.logs);

        eprintln!();
        let s = &report.summary;
        if s.failed > 0 {
            eprintln!(
                "Completed with errors: {} cleaned, {} skipped, {} failed",
                s.cleaned, s.skipped, s.failed
            );
        } else {
            eprintln!("Done! Cleaned {} files", s.cleaned);
            if s.skipped > 0 {
                eprintln!("  ({} files skipped - unsupported type)", s.skipped);
            }
        }
    }

    if report.has_failures() {
        CliResult::Error(format!(
            "{} file(s) could not be cleaned",
            report.summary.failed
        ))
    } else {
        CliResult::Success
    }
}

fn print_recover_result(result: &RecoverResult, json_output: bool, quiet: bool) -> CliResult {
    if json_output {
        if let CliResult::Error(e) = print_json(result, "result") {
            return CliResult::Error(e);
        }
    } else if !quiet {
        print_logs(&result.logs);
        eprintln!();
        eprintln!(
            "Restored {} files ({} had no backup)",
            result.summary.restored, result.summary.no_backup
        );
    }

    if result.summary.errors > 0 {
        CliResult::Error(format!(
            "{} backup(s) could not be restored",
            result.summary.errors
        ))
    } else {
        CliResult::Success
    }
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_check(ctx: &Context) -> CliResult {
    match ctx.require_tool() {
        Ok(version) => {
            println!("ExifTool {} ({})", version, ctx.config.exiftool.display());
            CliResult::Success
        }
        Err(e) => e,
    }
}

#[derive(Serialize)]
struct FileMetadataOutput {
    path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    groups: Vec<FieldGroup>,
}

fn cmd_show(ctx: &Context, files: Vec<PathBuf>, json_output: bool) -> CliResult {
    if let Err(e) = ctx.require_tool() {
        return e;
    }

    let mut session = Session::new(
        Arc::clone(&ctx.tool),
        Arc::clone(&ctx.labels),
        ctx.config.backup_suffix.clone(),
    );
    if let Err(e) = session.set_files(files) {
        return CliResult::UsageError(e.to_string());
    }

    let mut outputs = Vec::new();
    let mut failures = 0;
    loop {
        if !session.wait(ctx.load_wait()) {
            return CliResult::Error("Timed out waiting for ExifTool".to_string());
        }
        let path = match session.current() {
            Ok(p) => p.to_path_buf(),
            Err(e) => return CliResult::Error(e.to_string()),
        };
        let error = session.load_error().map(str::to_string);
        if let Some(e) = &error {
            failures += 1;
            status!(json_output, "Error: {}: {}", path.display(), e);
        } else if !json_output {
            print_organized(&session.title().unwrap_or_default(), session.organized());
        }
        outputs.push(FileMetadataOutput {
            path,
            error,
            groups: session.organized().groups.clone(),
        });

        match session.next() {
            Ok(true) => {
                if !json_output {
                    println!();
                }
            }
            Ok(false) => break,
            Err(e) => return CliResult::Error(e.to_string()),
        }
    }

    if json_output {
        if let CliResult::Error(e) = print_json(&outputs, "metadata") {
            return CliResult::Error(e);
        }
    }

    if failures > 0 {
        CliResult::Error(format!("{} file(s) could not be read", failures))
    } else {
        CliResult::Success
    }
}

#[derive(Serialize)]
struct EditOutput<'a> {
    path: &'a Path,
    dry_run: bool,
    edits: &'a BTreeMap<String, String>,
    args: Vec<String>,
}

fn cmd_edit(
    ctx: &Context,
    file: &Path,
    assignments: Vec<(String, String)>,
    dry_run: bool,
    json_output: bool,
) -> CliResult {
    if let Err(e) = policy::check_supported(file) {
        return CliResult::Error(e.to_string());
    }
    if let Err(e) = ctx.require_tool() {
        return e;
    }

    let raw = match ctx.tool.load_metadata(file) {
        Ok(raw) => raw,
        Err(e) => return CliResult::Error(e.to_string()),
    };
    let mut store = MetadataStore::new();
    store.load(raw);

    for (key, value) in &assignments {
        match store.stage(key, value.as_str()) {
            Ok(()) => {}
            Err(Error::UnknownField(k)) => {
                return CliResult::UsageError(format!(
                    "Unknown field '{}': it is not present in {} and is not a known writable tag",
                    k,
                    file.display()
                ))
            }
            Err(e) => return CliResult::Error(e.to_string()),
        }
        if tags::is_read_only_key(key) {
            status!(
                ctx.quiet || json_output,
                "Warning: {} is computed by ExifTool and cannot be written; ignoring it",
                key
            );
        }
    }

    let edits = store.writable_pending();
    let args: Vec<String> = tool::apply_args(file, &edits)
        .unwrap_or_default()
        .iter()
        .map(|a| a.to_string_lossy().to_string())
        .collect();

    if edits.is_empty() {
        status!(ctx.quiet || json_output, "Nothing to write.");
    } else if dry_run {
        if !json_output {
            let mut line = shell_quote(&ctx.config.exiftool.to_string_lossy());
            for arg in &args {
                line.push(' ');
                line.push_str(&shell_quote(arg));
            }
            println!("{}", line);
        }
    } else {
        status!(ctx.quiet || json_output, "Writing {} field(s) to {}...", edits.len(), file.display());
        if let Err(e) = ctx.tool.apply_edits(file, &edits) {
            return CliResult::Error(e.to_string());
        }
        status!(ctx.quiet || json_output, "Saved {}", file.display());
    }

    if json_output {
        return print_json(
            &EditOutput {
                path: file,
                dry_run,
                edits: &edits,
                args,
            },
            "result",
        );
    }
    CliResult::Success
}

fn cmd_clean(ctx: &Context, files: Vec<PathBuf>, yes: bool, json_output: bool) -> CliResult {
    // Require --yes to prevent accidental stripping
    if !yes {
        return CliResult::UsageError(format!(
            "Refusing to remove metadata from {} file(s) without confirmation. Use --yes to confirm.",
            files.len()
        ));
    }
    if let Err(e) = ctx.require_tool() {
        return e;
    }

    let quiet = ctx.quiet || json_output;
    let orchestrator = CleanOrchestrator::new(Arc::clone(&ctx.tool))
        .with_backup_suffix(ctx.config.backup_suffix.clone());
    let report = orchestrator.run(&files, &mut |event| {
        if let CleanEvent::StateChanged {
            index,
            path,
            state: CleanState::Stripping,
        } = event
        {
            status!(quiet, "[{}/{}] Cleaning {}...", index + 1, files.len(), path.display());
        }
    });

    print_clean_report(&report, json_output, ctx.quiet)
}

fn cmd_recover(ctx: &Context, files: Vec<PathBuf>, json_output: bool) -> CliResult {
    let orchestrator = CleanOrchestrator::new(Arc::clone(&ctx.tool))
        .with_backup_suffix(ctx.config.backup_suffix.clone());
    let result = orchestrator.recover(&files);
    print_recover_result(&result, json_output, ctx.quiet)
}

const BROWSE_HELP: &str = "\
Commands:
    show            print metadata of the current file
    next, prev      move through the file set
    set K=V         stage an edit, e.g. set EXIF:Artist=Jane
    save            write staged edits
    undo            drop staged edits and reload
    clean           remove metadata from every file in the set
    help            show this help
    quit            leave";

fn describe_event(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::ActiveFileChanged { title, .. } => Some(format!("-> {}", title)),
        SessionEvent::LoadFailed { path, error } => {
            Some(format!("! Could not read {}: {}", path.display(), error))
        }
        SessionEvent::EditStaged { key, value } => Some(format!("~ {} = {}", key, value)),
        SessionEvent::EditsDiscarded => Some("~ Edits discarded".to_string()),
        SessionEvent::Saved { path } => Some(format!("+ Saved {}", path.display())),
        SessionEvent::SaveFailed { path, error } => {
            Some(format!("! Could not save {}: {}", path.display(), error))
        }
        SessionEvent::CleanProgress(CleanEvent::StateChanged { path, state, .. })
            if state.is_terminal() =>
        {
            Some(format!("  {:?}: {}", state, path.display()))
        }
        SessionEvent::CleanFinished { summary } => Some(format!(
            "Clean finished: {} cleaned, {} skipped, {} failed",
            summary.cleaned, summary.skipped, summary.failed
        )),
        _ => None,
    }
}

fn run_browse_command(session: &mut Session, line: &str) -> Result<bool, Error> {
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((c, r)) => (c, r.trim()),
        None => (line, ""),
    };

    match command {
        "show" => {
            print_organized(&session.title().unwrap_or_default(), session.organized());
            if session.has_pending_edits() {
                println!("  ({} unsaved edit(s))", session.pending_edits().len());
            }
        }
        "next" => {
            if !session.next()? {
                eprintln!("Already at the last file");
            }
        }
        "prev" => {
            if !session.prev()? {
                eprintln!("Already at the first file");
            }
        }
        "set" => match parse_assignment(rest) {
            Ok((key, value)) => session.stage(&key, &value)?,
            Err(e) => eprintln!("{}", e),
        },
        "save" => {
            if !session.save()? {
                eprintln!("Nothing to save");
            }
        }
        "undo" => session.undo()?,
        "clean" => session.clean()?,
        "help" => eprintln!("{}", BROWSE_HELP),
        "quit" | "exit" => return Ok(false),
        other => eprintln!("Unknown command '{}'. Type 'help' for a list.", other),
    }
    Ok(true)
}

fn cmd_browse(ctx: &Context, files: Vec<PathBuf>) -> CliResult {
    if let Err(e) = ctx.require_tool() {
        return e;
    }

    let mut session = Session::new(
        Arc::clone(&ctx.tool),
        Arc::clone(&ctx.labels),
        ctx.config.backup_suffix.clone(),
    );
    let quiet = ctx.quiet;
    session.subscribe(move |event| {
        if let Some(text) = describe_event(event) {
            status!(quiet, "{}", text);
        }
    });

    if let Err(e) = session.set_files(files) {
        return CliResult::UsageError(e.to_string());
    }
    session.wait(ctx.load_wait());
    status!(quiet, "Type 'help' for commands.");

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => return CliResult::Error(format!("Failed to read input: {}", e)),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match run_browse_command(&mut session, line) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => eprintln!("Error: {}", e),
        }

        // A clean runs as long as it needs; everything else is one round trip
        while session.is_busy() && !session.wait(ctx.load_wait()) {
            if !session.is_busy() {
                break;
            }
            status!(quiet, "Still working...");
        }
    }

    if session.has_pending_edits() {
        status!(quiet, "Warning: {} unsaved edit(s) discarded", session.pending_edits().len());
    }
    CliResult::Success
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match build_context(&cli) {
        Ok(ctx) => match cli.command {
            Commands::Check => cmd_check(&ctx),
            Commands::Show { files, json } => cmd_show(&ctx, files, json),
            Commands::Edit {
                file,
                assignments,
                dry_run,
                json,
            } => cmd_edit(&ctx, &file, assignments, dry_run, json),
            Commands::Clean { files, yes, json } => cmd_clean(&ctx, files, yes, json),
            Commands::Recover { files, json } => cmd_recover(&ctx, files, json),
            Commands::Browse { files } => cmd_browse(&ctx, files),
        },
        Err(e) => e,
    };

    match result {
        CliResult::Success => std::process::exit(exit_codes::SUCCESS),
        CliResult::Error(e) => {
            // Errors always print, regardless of --quiet
            eprintln!("Error: {}", e);
            std::process::exit(exit_codes::ERROR);
        }
        CliResult::UsageError(e) => {
            // Usage errors always print, regardless of --quiet
            eprintln!("Error: {}", e);
            std::process::exit(exit_codes::USAGE_ERROR);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== parse_assignment tests ====================

    #[test]
    fn test_parse_assignment_simple() {
        let (k, v) = parse_assignment("EXIF:Make=Canon").unwrap();
        assert_eq!(k, "EXIF:Make");
        assert_eq!(v, "Canon");
    }

    #[test]
    fn test_parse_assignment_value_with_equals() {
        let (k, v) = parse_assignment("XMP:Title=a=b").unwrap();
        assert_eq!(k, "XMP:Title");
        assert_eq!(v, "a=b");
    }

    #[test]
    fn test_parse_assignment_empty_value() {
        let (_, v) = parse_assignment("EXIF:Artist=").unwrap();
        assert_eq!(v, "");
    }

    #[test]
    fn test_parse_assignment_no_equals() {
        assert!(parse_assignment("EXIF:Make").is_err());
    }

    #[test]
    fn test_parse_assignment_empty_key() {
        assert!(parse_assignment("=Canon").is_err());
    }

    #[test]
    fn test_parse_assignment_requires_group() {
        let err = parse_assignment("Make=Canon").unwrap_err();
        assert!(err.contains("Group:Tag"));
    }

    // ==================== formatting tests ====================

    #[test]
    fn test_pad_to_width_unicode() {
        assert_eq!(pad_to_width("Größe", 7), "Größe  ");
        assert_eq!(pad_to_width("LongerThanWidth", 4), "LongerThanWidth");
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("-Make=Canon"), "-Make=Canon");
        assert_eq!(shell_quote("-Title=Two words"), "'-Title=Two words'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_log_filter() {
        assert_eq!(log_filter(0, false), "warn");
        assert_eq!(log_filter(2, false), "debug");
        assert_eq!(log_filter(5, false), "trace");
        assert_eq!(log_filter(3, true), "error");
    }

    #[test]
    fn test_describe_event_hides_internal_events() {
        assert!(describe_event(&SessionEvent::FilesChanged { count: 2 }).is_none());
        assert_eq!(
            describe_event(&SessionEvent::EditsDiscarded).as_deref(),
            Some("~ Edits discarded")
        );
    }

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "metaclean", "show", "a.jpg", "--timeout", "5", "-vv", "--exiftool", "/opt/exiftool",
        ])
        .unwrap();
        assert_eq!(cli.timeout, Some(5));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.exiftool, Some(PathBuf::from("/opt/exiftool")));
    }

    #[test]
    fn test_cli_edit_requires_set() {
        assert!(Cli::try_parse_from(["metaclean", "edit", "a.jpg"]).is_err());
        assert!(Cli::try_parse_from(["metaclean", "edit", "a.jpg", "--set", "Make=x"]).is_err());
    }

    #[test]
    fn test_load_wait_saturates_for_huge_timeout() {
        let ctx = Context {
            config: Config {
                timeout: Duration::MAX,
                ..Config::default()
            },
            tool: Arc::new(metaclean_lib::ExifTool::default()),
            labels: Arc::new(NoLabels),
            quiet: true,
        };
        assert_eq!(ctx.load_wait(), Duration::MAX);
    }
}
