//! Per-run agent log.
//!
//! Everything the agent prints ends up in one append-only file, one entry
//! per line:
//!
//! ```text
//! [2024-05-01T10:00:00.123456+09:00] [INFO] Running tests...
//! [2024-05-01T10:00:01.004211+09:00] [ERROR] warning: unused variable
//! ```
//!
//! The file's location is private to the machine that ran the agent. What
//! leaves the machine is [`LogSink::masked_url`], which swaps the directory
//! for a short digest of a seed.

use crate::error::{Result, RunnerError};
use chrono::{Local, SecondsFormat};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Hex characters kept from the seed digest.
const MASK_LEN: usize = 8;

/// Numbered names tried by [`LogSink::create_unique`] before giving up.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// First eight hex characters of the SHA-256 digest of `seed`.
pub fn mask(seed: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(seed.as_bytes()));
    digest[..MASK_LEN].to_string()
}

/// Append-only, line-oriented log file shared by the output readers.
///
/// Appends are serialized through an internal lock; each entry is written
/// with a single `write_all` while the lock is held, so concurrent writers
/// never produce split or interleaved lines.
#[derive(Debug)]
pub struct LogSink {
    path: PathBuf,
    masked_dir: String,
    file: Mutex<Option<File>>,
}

impl LogSink {
    /// Create a sink for `path`.
    ///
    /// `seed` drives the masked directory segment; when omitted it is the
    /// absolute path of the file's parent directory. Nothing touches the
    /// filesystem until the first append.
    pub fn new<P: AsRef<Path>>(path: P, seed: Option<&str>) -> Result<Self> {
        let path = std::path::absolute(path.as_ref()).map_err(|e| {
            RunnerError::LogError(format!(
                "failed to resolve log path '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        if path.file_name().is_none() {
            return Err(RunnerError::LogError(format!(
                "log path '{}' has no file name",
                path.display()
            )));
        }

        let masked_dir = match seed {
            Some(seed) => mask(seed),
            None => {
                let parent = path.parent().unwrap_or_else(|| Path::new("/"));
                mask(&parent.to_string_lossy())
            }
        };

        Ok(Self {
            path,
            masked_dir,
            file: Mutex::new(None),
        })
    }

    /// Claim a fresh file in `dir` named `<stem>.log`, or `<stem>_<n>.log`
    /// when that is taken.
    ///
    /// The name is reserved by creating the file exclusively, so two runs
    /// racing for the same stem never share a file.
    pub fn create_unique(dir: &Path, stem: &str, seed: Option<&str>) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| {
            RunnerError::LogError(format!(
                "failed to create log directory '{}': {}",
                dir.display(),
                e
            ))
        })?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = match attempt {
                0 => format!("{}.log", stem),
                n => format!("{}_{}.log", stem, n),
            };
            let path = dir.join(name);
            match OpenOptions::new().append(true).create_new(true).open(&path) {
                Ok(file) => {
                    return Ok(Self {
                        file: Mutex::new(Some(file)),
                        ..Self::new(&path, seed)?
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(RunnerError::LogError(format!(
                        "failed to create log file '{}': {}",
                        path.display(),
                        e
                    )));
                }
            }
        }

        Err(RunnerError::LogError(format!(
            "no free log file name for '{}' in '{}'",
            stem,
            dir.display()
        )))
    }

    /// Append one entry: `[<timestamp>] [<LEVEL>] <message>`.
    ///
    /// A multi-line message becomes one entry per line, all with the same
    /// prefix, written together.
    pub fn append(&self, level: LogLevel, message: &str) -> Result<()> {
        let timestamp = Local::now().to_rfc3339_opts(SecondsFormat::Micros, false);
        let mut entry = String::new();
        let mut lines = message.lines().peekable();
        if lines.peek().is_none() {
            entry.push_str(&format!("[{}] [{}] \n", timestamp, level));
        }
        for line in lines {
            entry.push_str(&format!("[{}] [{}] {}\n", timestamp, level, line));
        }

        // Poisoning only means another writer panicked; the handle is fine.
        let mut guard = self
            .file
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());

        if guard.is_none() {
            *guard = Some(self.open()?);
        }
        let Some(file) = guard.as_mut() else {
            return Err(RunnerError::LogError("log file is not open".to_string()));
        };

        file.write_all(entry.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| {
                RunnerError::LogError(format!(
                    "failed to write to log file '{}': {}",
                    self.path.display(),
                    e
                ))
            })
    }

    pub fn info(&self, message: &str) -> Result<()> {
        self.append(LogLevel::Info, message)
    }

    pub fn error(&self, message: &str) -> Result<()> {
        self.append(LogLevel::Error, message)
    }

    /// The real absolute path. For local display only; never post it.
    pub fn resource(&self) -> &Path {
        &self.path
    }

    /// Shareable reference: `file:///<masked-dir>/<file-name>`.
    pub fn masked_url(&self) -> String {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("file:///{}/{}", self.masked_dir, file_name)
    }

    fn open(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                RunnerError::LogError(format!(
                    "failed to create log directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                RunnerError::LogError(format!(
                    "failed to open log file '{}': {}",
                    self.path.display(),
                    e
                ))
            })
    }
}
