//! JSONL activity log: one self-contained JSON object per lifecycle call.
//!
//! Lines are assembled in memory and written with a single `write_all` so a
//! concurrent `tail -f` never sees a partial line. File content is never
//! logged; entries carry its SHA-256 instead.
//!
//! Fallback chain when the log cannot be written:
//! 1. Primary file path
//! 2. Fallback path (if configured)
//! 3. stderr with `[STICKY-JSONL]` prefix
//! 4. Silent discard (logging never fails a reconciliation)

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions, rename};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::config::LoggingConfig;
use crate::core::errors::{Result, StickyError};

/// Severity level for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Activity event types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    FileCreate,
    FileRead,
    FileHeal,
    FileUpdate,
    FileDelete,
    FileImport,
    RefreshComplete,
    ApplyStart,
    ApplyComplete,
    DestroyComplete,
    ValidationFailed,
    Error,
}

/// A single JSONL log entry; all fields optional except `ts`, `event`, `severity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    /// Manifest name of the resource, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<String>,
    /// Hex SHA-256 of the managed content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_sha256: Option<String>,
    /// Content length in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Freeform details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            resource: None,
            path: None,
            permissions: None,
            content_sha256: None,
            size: None,
            ok: None,
            error_code: None,
            error_message: None,
            duration_ms: None,
            details: None,
        }
    }

    /// Hex SHA-256 of `content`.
    pub fn fingerprint(content: &str) -> String {
        use std::fmt::Write as _;

        let digest = Sha256::digest(content.as_bytes());
        digest.iter().fold(String::with_capacity(64), |mut s, b| {
            let _ = write!(s, "{b:02x}");
            s
        })
    }
}

/// Degradation state of the JSONL writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Primary,
    Fallback,
    Stderr,
    Discard,
}

/// Where and how the activity log is written.
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    pub path: PathBuf,
    pub fallback_path: Option<PathBuf>,
    /// Rotate once the file would grow past this size.
    pub max_size_bytes: u64,
    /// Rotated generations kept next to the live file (`.1` is newest).
    pub max_rotated_files: u32,
    pub fsync_interval_secs: u64,
}

impl JsonlConfig {
    /// Build from the `[logging]` section and the configured log paths.
    pub fn from_settings(
        path: PathBuf,
        fallback_path: Option<PathBuf>,
        logging: &LoggingConfig,
    ) -> Self {
        Self {
            path,
            fallback_path,
            max_size_bytes: logging.max_size_bytes,
            max_rotated_files: logging.max_rotated_files,
            fsync_interval_secs: logging.fsync_interval_secs,
        }
    }
}

/// Append-only JSONL writer with size rotation and degradation.
pub struct JsonlWriter {
    config: JsonlConfig,
    writer: Option<BufWriter<File>>,
    state: WriterState,
    bytes_written: u64,
    last_fsync: SystemTime,
}

impl JsonlWriter {
    /// Open the log, falling through the degradation chain on failure.
    pub fn open(config: JsonlConfig) -> Self {
        let mut w = Self {
            config,
            writer: None,
            state: WriterState::Discard,
            bytes_written: 0,
            last_fsync: SystemTime::now(),
        };
        match open_append(&w.config.path) {
            Ok((file, size)) => w.attach(file, size, WriterState::Primary),
            Err(_) => w.try_open_fallback(),
        }
        w
    }

    /// Write one entry as one line.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        match serde_json::to_string(entry) {
            Ok(json) => self.write_line(&format!("{json}\n")),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[STICKY-JSONL] serialize error: {e}");
            }
        }
    }

    pub fn flush(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
    }

    /// Flush and fsync the underlying file.
    pub fn fsync(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
            let _ = w.get_ref().sync_data();
            self.last_fsync = SystemTime::now();
        }
    }

    /// Current degradation state.
    pub fn state(&self) -> &'static str {
        match self.state {
            WriterState::Primary => "primary",
            WriterState::Fallback => "fallback",
            WriterState::Stderr => "stderr",
            WriterState::Discard => "discard",
        }
    }

    // ──────────────────────── internals ────────────────────────

    fn attach(&mut self, file: File, size: u64, state: WriterState) {
        self.writer = Some(BufWriter::with_capacity(16 * 1024, file));
        self.state = state;
        self.bytes_written = size;
    }

    fn write_line(&mut self, line: &str) {
        if self.bytes_written + line.len() as u64 > self.config.max_size_bytes
            && matches!(self.state, WriterState::Primary | WriterState::Fallback)
        {
            self.rotate();
        }

        match self.state {
            WriterState::Primary | WriterState::Fallback => {
                let written = self
                    .writer
                    .as_mut()
                    .is_some_and(|w| w.write_all(line.as_bytes()).is_ok());
                if written {
                    self.bytes_written += line.len() as u64;
                    self.maybe_fsync();
                } else {
                    self.degrade();
                    self.write_line(line);
                }
            }
            WriterState::Stderr => {
                let _ = write!(io::stderr(), "[STICKY-JSONL] {line}");
            }
            WriterState::Discard => {}
        }
    }

    fn maybe_fsync(&mut self) {
        let elapsed = SystemTime::now()
            .duration_since(self.last_fsync)
            .unwrap_or(Duration::ZERO);
        if elapsed.as_secs() >= self.config.fsync_interval_secs {
            self.fsync();
        }
    }

    fn try_open_fallback(&mut self) {
        let Some(fb) = self.config.fallback_path.clone() else {
            self.state = WriterState::Stderr;
            let _ = writeln!(
                io::stderr(),
                "[STICKY-JSONL] cannot open {} and no fallback configured, using stderr",
                self.config.path.display()
            );
            return;
        };
        if let Ok((file, size)) = open_append(&fb) {
            let _ = writeln!(
                io::stderr(),
                "[STICKY-JSONL] primary path failed, using fallback: {}",
                fb.display()
            );
            self.attach(file, size, WriterState::Fallback);
        } else {
            self.state = WriterState::Stderr;
            let _ = writeln!(
                io::stderr(),
                "[STICKY-JSONL] primary and fallback paths failed, using stderr"
            );
        }
    }

    fn degrade(&mut self) {
        self.writer = None;
        match self.state {
            WriterState::Primary => self.try_open_fallback(),
            WriterState::Fallback => {
                self.state = WriterState::Stderr;
                let _ = writeln!(io::stderr(), "[STICKY-JSONL] fallback write failed, using stderr");
            }
            WriterState::Stderr | WriterState::Discard => self.state = WriterState::Discard,
        }
    }

    fn rotate(&mut self) {
        self.flush();
        self.writer = None;

        let base = match self.state {
            WriterState::Primary => self.config.path.clone(),
            WriterState::Fallback => match &self.config.fallback_path {
                Some(p) => p.clone(),
                None => return,
            },
            WriterState::Stderr | WriterState::Discard => return,
        };

        // .N is dropped, .N-1 → .N, …, live → .1
        let _ = fs::remove_file(rotated_name(&base, self.config.max_rotated_files));
        for i in (1..self.config.max_rotated_files).rev() {
            let _ = rename(rotated_name(&base, i), rotated_name(&base, i + 1));
        }
        let _ = rename(&base, rotated_name(&base, 1));

        match open_append(&base) {
            Ok((file, _)) => {
                let state = self.state;
                self.attach(file, 0, state);
            }
            Err(_) => self.degrade(),
        }
    }
}

// ──────────────────────── helpers ────────────────────────

/// Open or create a file for appending, creating parent directories.
/// Returns `(File, current_size)`.
fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| StickyError::Runtime {
            details: format!("create log directory {}: {source}", parent.display()),
        })?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| StickyError::Runtime {
            details: format!("open activity log {}: {source}", path.display()),
        })?;
    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    Ok((file, size))
}

/// `activity.jsonl` → `activity.jsonl.3`.
fn rotated_name(base: &Path, index: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

// ──────────────────────── tests ────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn config(path: PathBuf, max_size_bytes: u64) -> JsonlConfig {
        JsonlConfig {
            path,
            fallback_path: None,
            max_size_bytes,
            max_rotated_files: 3,
            fsync_interval_secs: 60,
        }
    }

    #[test]
    fn write_entry_produces_valid_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        let mut writer = JsonlWriter::open(config(path.clone(), 1024 * 1024));

        let mut entry = LogEntry::new(EventType::FileHeal, Severity::Info);
        entry.resource = Some("motd".to_string());
        writer.write_entry(&entry);
        writer.write_entry(&LogEntry::new(EventType::RefreshComplete, Severity::Info));
        writer.flush();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["event"], "file_heal");
        assert_eq!(parsed["severity"], "info");
        assert_eq!(parsed["resource"], "motd");
    }

    #[test]
    fn optional_fields_omitted_when_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sparse.jsonl");
        let mut writer = JsonlWriter::open(config(path.clone(), 1024 * 1024));
        writer.write_entry(&LogEntry::new(EventType::ApplyStart, Severity::Info));
        writer.flush();

        let line = fs::read_to_string(&path).unwrap();
        assert!(!line.contains("\"path\""));
        assert!(!line.contains("\"content_sha256\""));
    }

    #[test]
    fn rotation_shifts_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rot.jsonl");
        let mut writer = JsonlWriter::open(config(path.clone(), 100));

        for _ in 0..10 {
            writer.write_entry(&LogEntry::new(EventType::FileRead, Severity::Info));
        }
        writer.flush();

        assert!(path.exists());
        assert!(rotated_name(&path, 1).exists());
        assert!(!rotated_name(&path, 4).exists());
    }

    #[test]
    fn fallback_when_primary_unwritable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "x").unwrap();
        let fallback = dir.path().join("fallback.jsonl");
        let mut cfg = config(blocker.join("primary.jsonl"), 1024 * 1024);
        cfg.fallback_path = Some(fallback.clone());

        let mut writer = JsonlWriter::open(cfg);
        assert_eq!(writer.state(), "fallback");
        writer.write_entry(&LogEntry::new(EventType::Error, Severity::Warning));
        writer.flush();

        assert!(!fs::read_to_string(&fallback).unwrap().is_empty());
    }

    #[test]
    fn stderr_when_nothing_is_writable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "x").unwrap();
        let writer = JsonlWriter::open(config(blocker.join("primary.jsonl"), 1024));
        assert_eq!(writer.state(), "stderr");
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        assert_eq!(
            LogEntry::fingerprint(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(LogEntry::fingerprint("hello").len(), 64);
    }

    #[test]
    fn from_settings_copies_logging_knobs() {
        let logging = LoggingConfig {
            enabled: true,
            max_size_bytes: 42,
            max_rotated_files: 7,
            fsync_interval_secs: 3,
        };
        let cfg = JsonlConfig::from_settings(PathBuf::from("a.jsonl"), None, &logging);
        assert_eq!(cfg.max_size_bytes, 42);
        assert_eq!(cfg.max_rotated_files, 7);
        assert_eq!(cfg.fsync_interval_secs, 3);
    }
}
