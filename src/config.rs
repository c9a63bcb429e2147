//! Settings resolution.
//!
//! Each setting is taken from the first source that provides it:
//! 1. Command-line flag
//! 2. Environment variable (`METACLEAN_EXIFTOOL`, `METACLEAN_TIMEOUT_SECS`)
//! 3. TOML config file (`<config dir>/metaclean/config.toml`)
//! 4. Built-in default

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::backup::DEFAULT_BACKUP_SUFFIX;
use crate::error::{Error, Result};
use crate::tool::{ExifTool, DEFAULT_PROGRAM, DEFAULT_TIMEOUT};

pub const ENV_EXIFTOOL: &str = "METACLEAN_EXIFTOOL";
pub const ENV_TIMEOUT_SECS: &str = "METACLEAN_TIMEOUT_SECS";

/// Longest accepted per-invocation timeout (one day)
pub const MAX_TIMEOUT_SECS: u64 = 86_400;

/// Values given on the command line; `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub exiftool: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub labels: Option<PathBuf>,
}

/// Config file layout. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    exiftool: Option<PathBuf>,
    timeout_secs: Option<u64>,
    backup_suffix: Option<String>,
    labels: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub exiftool: PathBuf,
    pub timeout: Duration,
    pub backup_suffix: String,
    pub labels: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            exiftool: PathBuf::from(DEFAULT_PROGRAM),
            timeout: DEFAULT_TIMEOUT,
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
            labels: None,
        }
    }
}

/// `<config dir>/metaclean/config.toml`, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("metaclean").join("config.toml"))
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
}

fn parse_timeout(raw: &str, source: &str) -> Result<u64> {
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} must be a whole number of seconds, got '{}'", source, raw)))?;
    if secs == 0 {
        return Err(Error::Config(format!("{} must be at least 1 second", source)));
    }
    if secs > MAX_TIMEOUT_SECS {
        return Err(Error::Config(format!(
            "{} must be at most {} seconds, got {}",
            source, MAX_TIMEOUT_SECS, secs
        )));
    }
    Ok(secs)
}

impl Config {
    /// Resolve against the process environment and the default config file.
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let file = default_config_path().filter(|p| p.exists());
        Self::resolve(overrides, |name| std::env::var(name).ok(), file.as_deref())
    }

    /// Resolve from explicit sources.
    pub fn resolve<F>(overrides: &ConfigOverrides, env: F, config_file: Option<&Path>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match config_file {
            Some(path) => {
                debug!("Reading config file {}", path.display());
                read_config_file(path)?
            }
            None => ConfigFile::default(),
        };
        let defaults = Config::default();

        let exiftool = overrides
            .exiftool
            .clone()
            .or_else(|| env(ENV_EXIFTOOL).filter(|v| !v.is_empty()).map(PathBuf::from))
            .or(file.exiftool)
            .unwrap_or(defaults.exiftool);

        let timeout_secs = match overrides.timeout_secs {
            Some(secs) => Some(parse_timeout(&secs.to_string(), "--timeout")?),
            None => match env(ENV_TIMEOUT_SECS).filter(|v| !v.is_empty()) {
                Some(raw) => Some(parse_timeout(&raw, ENV_TIMEOUT_SECS)?),
                None => match file.timeout_secs {
                    Some(secs) => Some(parse_timeout(&secs.to_string(), "timeout_secs")?),
                    None => None,
                },
            },
        };

        let backup_suffix = file.backup_suffix.unwrap_or(defaults.backup_suffix);
        if backup_suffix.is_empty() || backup_suffix.contains(['/', '\\']) {
            return Err(Error::Config(format!(
                "backup_suffix '{}' must be a non-empty file name suffix",
                backup_suffix
            )));
        }

        Ok(Config {
            exiftool,
            timeout: timeout_secs.map(Duration::from_secs).unwrap_or(defaults.timeout),
            backup_suffix,
            labels: overrides.labels.clone().or(file.labels),
        })
    }

    pub fn tool(&self) -> ExifTool {
        ExifTool::new(&self.exiftool, self.timeout)
    }
}
