//! Lifecycle state machine for a single sticky file.
//!
//! Nothing is persisted here: each call derives its behaviour from the hook
//! that was invoked and what `stat` reports for the record's path right now.
//!
//! | hook   | exists          | absent             | stat error   |
//! |--------|-----------------|--------------------|--------------|
//! | create | overwrite       | write              | (no stat)    |
//! | read   | keep            | rewrite, keep      | IOError stat |
//! | update | overwrite       | write              | (no stat)    |
//! | delete | remove, drop    | drop               | IOError stat |

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use std::time::Instant;

use serde::Serialize;

use crate::core::errors::{ImportOp, IoOp, Result, StickyError};
use crate::logger::jsonl::{EventType, JsonlWriter, LogEntry, Severity};
use crate::model::diagnostics::Diagnostics;
use crate::model::file::ManagedFile;

use super::writer::write_file;

/// What the host should do with its stored record after a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    /// Store this record.
    Set(ManagedFile),
    /// Keep whatever was stored before.
    Keep,
    /// The record no longer exists.
    Remove,
}

/// What the call did on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Wrote,
    Healed,
    Unchanged,
    Removed,
    AlreadyAbsent,
    Imported,
    Failed,
}

impl Action {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wrote => "wrote",
            Self::Healed => "healed",
            Self::Unchanged => "unchanged",
            Self::Removed => "removed",
            Self::AlreadyAbsent => "already absent",
            Self::Imported => "imported",
            Self::Failed => "failed",
        }
    }
}

/// Result of one lifecycle call.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub state: StateChange,
    pub action: Action,
    pub diagnostics: Diagnostics,
}

impl Outcome {
    fn ok(state: StateChange, action: Action) -> Self {
        Self {
            state,
            action,
            diagnostics: Diagnostics::new(),
        }
    }

    fn failed(err: StickyError) -> Self {
        Self {
            state: StateChange::Keep,
            action: Action::Failed,
            diagnostics: Diagnostics::from(err),
        }
    }

    /// True when no error diagnostic was produced.
    pub fn succeeded(&self) -> bool {
        !self.diagnostics.has_error()
    }
}

/// Presence of a path as seen by `stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observed {
    Exists,
    Absent,
}

/// Stat `path`; anything other than not-found is an error.
pub fn observe(path: &Path) -> Result<Observed> {
    match fs::metadata(path) {
        Ok(_) => Ok(Observed::Exists),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Observed::Absent),
        Err(e) => Err(StickyError::io(IoOp::Stat, path, e)),
    }
}

/// The `local_sticky_file` resource: Create, Read, Update, Delete, Import.
#[derive(Default)]
pub struct StickyFileResource {
    activity: Option<JsonlWriter>,
    resource_name: Option<String>,
}

impl StickyFileResource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every lifecycle call in an activity log.
    #[must_use]
    pub fn with_activity_log(mut self, writer: JsonlWriter) -> Self {
        self.activity = Some(writer);
        self
    }

    /// Name stamped on activity log entries until changed.
    pub fn set_resource_name(&mut self, name: Option<&str>) {
        self.resource_name = name.map(str::to_string);
    }

    /// The activity log, for entries that are not tied to one call.
    pub fn activity_mut(&mut self) -> Option<&mut JsonlWriter> {
        self.activity.as_mut()
    }

    /// Flush and hand back the activity log, if any.
    pub fn into_activity_log(mut self) -> Option<JsonlWriter> {
        if let Some(w) = self.activity.as_mut() {
            w.flush();
        }
        self.activity
    }

    /// Write `desired` unconditionally. An existing file at the path is
    /// overwritten without checking.
    pub fn create(&mut self, desired: &ManagedFile) -> Outcome {
        let started = Instant::now();
        let outcome = match write_file(desired) {
            Ok(()) => Outcome::ok(StateChange::Set(desired.clone()), Action::Wrote),
            Err(err) => Outcome::failed(err),
        };
        self.record(EventType::FileCreate, desired, &outcome, started);
        outcome
    }

    /// Regenerate the file if it vanished; otherwise leave everything alone.
    ///
    /// Only presence is checked. Content and mode drift on an existing file
    /// go unnoticed.
    pub fn read(&mut self, stored: &ManagedFile) -> Outcome {
        let started = Instant::now();
        let outcome = match observe(Path::new(&stored.path)) {
            Err(err) => Outcome::failed(err),
            Ok(Observed::Exists) => Outcome::ok(StateChange::Keep, Action::Unchanged),
            Ok(Observed::Absent) => match write_file(stored) {
                Ok(()) => Outcome::ok(StateChange::Keep, Action::Healed),
                Err(err) => Outcome::failed(err),
            },
        };
        let event = if outcome.action == Action::Healed {
            EventType::FileHeal
        } else {
            EventType::FileRead
        };
        self.record(event, stored, &outcome, started);
        outcome
    }

    /// Full overwrite with `desired`, whatever changed.
    pub fn update(&mut self, desired: &ManagedFile) -> Outcome {
        let started = Instant::now();
        let outcome = match write_file(desired) {
            Ok(()) => Outcome::ok(StateChange::Set(desired.clone()), Action::Wrote),
            Err(err) => Outcome::failed(err),
        };
        self.record(EventType::FileUpdate, desired, &outcome, started);
        outcome
    }

    /// Remove the file if present and drop the record. A file that is already
    /// gone counts as deleted.
    pub fn delete(&mut self, stored: &ManagedFile) -> Outcome {
        let started = Instant::now();
        let path = Path::new(&stored.path);
        let outcome = match observe(path) {
            Err(err) => Outcome::failed(err),
            Ok(Observed::Absent) => Outcome::ok(StateChange::Remove, Action::AlreadyAbsent),
            Ok(Observed::Exists) => match fs::remove_file(path) {
                Ok(()) => Outcome::ok(StateChange::Remove, Action::Removed),
                Err(e) => Outcome::failed(StickyError::io(IoOp::Remove, path, e)),
            },
        };
        self.record(EventType::FileDelete, stored, &outcome, started);
        outcome
    }

    /// Build a record from the file at `identifier`.
    pub fn import_state(&mut self, identifier: &str) -> Outcome {
        let started = Instant::now();
        let outcome = match import_file(identifier) {
            Ok(file) => Outcome::ok(StateChange::Set(file), Action::Imported),
            Err(err) => Outcome::failed(err),
        };
        let subject = match &outcome.state {
            StateChange::Set(file) => file.clone(),
            _ => ManagedFile::new(identifier, "", ""),
        };
        self.record(EventType::FileImport, &subject, &outcome, started);
        outcome
    }

    fn record(&mut self, event: EventType, file: &ManagedFile, outcome: &Outcome, started: Instant) {
        let Some(writer) = self.activity.as_mut() else {
            return;
        };
        let mut entry = if outcome.succeeded() {
            LogEntry::new(event, Severity::Info)
        } else {
            LogEntry::new(event, Severity::Warning)
        };
        entry.resource.clone_from(&self.resource_name);
        entry.path = Some(file.path.clone());
        entry.ok = Some(outcome.succeeded());
        entry.duration_ms = Some(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX));
        entry.details = Some(outcome.action.as_str().to_string());
        if outcome.action != Action::Failed {
            entry.permissions = Some(file.permissions.clone());
            entry.size = Some(file.content.len() as u64);
            entry.content_sha256 = Some(LogEntry::fingerprint(&file.content));
        }
        if let Some(diag) = outcome.diagnostics.first_error() {
            entry.error_code = diag.code.map(str::to_string);
            entry.error_message = Some(format!("{}: {}", diag.summary, diag.detail));
        }
        writer.write_entry(&entry);
    }
}

fn import_file(identifier: &str) -> Result<ManagedFile> {
    let path = Path::new(identifier);
    let mut handle = File::open(path).map_err(|e| StickyError::import(ImportOp::Open, path, e))?;

    let mut raw = Vec::new();
    handle
        .read_to_end(&mut raw)
        .map_err(|e| StickyError::import(ImportOp::Read, path, e))?;
    let content = String::from_utf8(raw).map_err(|e| {
        StickyError::import(
            ImportOp::Read,
            path,
            io::Error::new(io::ErrorKind::InvalidData, e.utf8_error()),
        )
    })?;

    let meta = handle
        .metadata()
        .map_err(|e| StickyError::import(ImportOp::Stat, path, e))?;

    Ok(ManagedFile {
        path: identifier.to_string(),
        content,
        permissions: format!("{:04o}", permission_bits(&meta)),
    })
}

#[cfg(unix)]
fn permission_bits(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt as _;
    meta.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn permission_bits(meta: &fs::Metadata) -> u32 {
    if meta.permissions().readonly() { 0o444 } else { 0o666 }
}
