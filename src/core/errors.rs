//! STK-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, StickyError>;

/// Filesystem step that failed while reconciling a managed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOp {
    Stat,
    Create,
    ParsePermissions,
    Chmod,
    WriteContent,
    Remove,
}

impl IoOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stat => "stat",
            Self::Create => "create",
            Self::ParsePermissions => "parse-permissions",
            Self::Chmod => "chmod",
            Self::WriteContent => "write-content",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for IoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step that failed while reconstructing a record from an existing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOp {
    Open,
    Read,
    Stat,
}

impl ImportOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Read => "read",
            Self::Stat => "stat",
        }
    }
}

impl fmt::Display for ImportOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error type for sticky_file.
#[derive(Debug, Error)]
pub enum StickyError {
    #[error("[STK-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[STK-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[STK-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[STK-1101] invalid value for {attribute}: {details}")]
    Validation {
        attribute: &'static str,
        details: String,
    },

    #[error("[STK-2001] {op} failure at {path}: {source}")]
    Io {
        op: IoOp,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[STK-2101] import {op} failure at {path}: {source}")]
    Import {
        op: ImportOp,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[STK-3001] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[STK-3002] state conflict for resource {name}: {details}")]
    StateConflict { name: String, details: String },

    #[error("[STK-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl StickyError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "STK-1001",
            Self::MissingConfig { .. } => "STK-1002",
            Self::ConfigParse { .. } => "STK-1003",
            Self::Validation { .. } => "STK-1101",
            Self::Io { .. } => "STK-2001",
            Self::Import { .. } => "STK-2101",
            Self::Serialization { .. } => "STK-3001",
            Self::StateConflict { .. } => "STK-3002",
            Self::Runtime { .. } => "STK-3900",
        }
    }

    /// Whether a later attempt by the host might succeed.
    ///
    /// Parse failures are deterministic; everything else touching the disk
    /// can be transient.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Io { op, .. } => !matches!(op, IoOp::ParsePermissions),
            Self::Runtime { .. } => true,
            _ => false,
        }
    }

    /// Convenience constructor for reconciliation IO errors.
    #[must_use]
    pub fn io(op: IoOp, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for import errors.
    #[must_use]
    pub fn import(op: ImportOp, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Import {
            op,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for attribute validation errors.
    #[must_use]
    pub fn validation(attribute: &'static str, details: impl Into<String>) -> Self {
        Self::Validation {
            attribute,
            details: details.into(),
        }
    }
}

impl From<serde_json::Error> for StickyError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for StickyError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io_err() -> std::io::Error {
        std::io::Error::other("test")
    }

    #[test]
    fn error_codes_are_unique() {
        let errors: Vec<StickyError> = vec![
            StickyError::InvalidConfig {
                details: String::new(),
            },
            StickyError::MissingConfig {
                path: PathBuf::new(),
            },
            StickyError::ConfigParse {
                context: "",
                details: String::new(),
            },
            StickyError::validation("permissions", ""),
            StickyError::io(IoOp::Stat, "", io_err()),
            StickyError::import(ImportOp::Open, "", io_err()),
            StickyError::Serialization {
                context: "",
                details: String::new(),
            },
            StickyError::StateConflict {
                name: String::new(),
                details: String::new(),
            },
            StickyError::Runtime {
                details: String::new(),
            },
        ];

        let codes: Vec<&str> = errors.iter().map(StickyError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
        assert!(codes.iter().all(|c| c.starts_with("STK-")));
    }

    #[test]
    fn display_includes_code_and_operation() {
        let err = StickyError::io(IoOp::WriteContent, "/tmp/out.txt", io_err());
        let msg = err.to_string();
        assert!(msg.contains("STK-2001"), "missing code: {msg}");
        assert!(msg.contains("write-content"), "missing op: {msg}");
        assert!(msg.contains("/tmp/out.txt"), "missing path: {msg}");
    }

    #[test]
    fn import_display_names_step() {
        let err = StickyError::import(ImportOp::Stat, "/tmp/in.txt", io_err());
        assert!(err.to_string().contains("import stat failure"));
        assert_eq!(err.code(), "STK-2101");
    }

    #[test]
    fn retryable_errors_are_correct() {
        assert!(StickyError::io(IoOp::Create, "", io_err()).is_retryable());
        assert!(StickyError::io(IoOp::Remove, "", io_err()).is_retryable());
        assert!(
            StickyError::Runtime {
                details: String::new()
            }
            .is_retryable()
        );

        assert!(!StickyError::io(IoOp::ParsePermissions, "", io_err()).is_retryable());
        assert!(!StickyError::validation("permissions", "bad").is_retryable());
        assert!(!StickyError::import(ImportOp::Read, "", io_err()).is_retryable());
        assert!(
            !StickyError::MissingConfig {
                path: PathBuf::new()
            }
            .is_retryable()
        );
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: StickyError = json_err.into();
        assert_eq!(err.code(), "STK-3001");
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: StickyError = toml_err.into();
        assert_eq!(err.code(), "STK-1003");
    }
}
