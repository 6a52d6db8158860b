//! Structured diagnostics returned to the host for every lifecycle call.
//!
//! Any error-severity entry marks the call as failed, independent of whatever
//! state the call also returned.

use serde::Serialize;

use crate::core::errors::{ImportOp, IoOp, StickyError};

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One diagnostic entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    /// Attribute the diagnostic refers to, when it is attribute-specific.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<&'static str>,
    /// STK error code of the underlying error, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    /// Running the same call again might succeed.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
            code: None,
            retryable: false,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(summary, detail)
        }
    }

    #[must_use]
    pub const fn with_attribute(mut self, attribute: &'static str) -> Self {
        self.attribute = Some(attribute);
        self
    }

    pub const fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

impl From<&StickyError> for Diagnostic {
    fn from(err: &StickyError) -> Self {
        let (summary, detail, attribute) = match err {
            StickyError::Validation { attribute, details } => {
                ("invalid value", details.clone(), Some(*attribute))
            }
            StickyError::Io { op, source, .. } => (io_summary(*op), source.to_string(), None),
            StickyError::Import { op, source, .. } => {
                (import_summary(*op), source.to_string(), Some("path"))
            }
            other => ("operation failed", other.to_string(), None),
        };
        Self {
            severity: Severity::Error,
            summary: summary.to_string(),
            detail,
            attribute,
            code: Some(err.code()),
            retryable: err.is_retryable(),
        }
    }
}

impl From<StickyError> for Diagnostic {
    fn from(err: StickyError) -> Self {
        Self::from(&err)
    }
}

const fn io_summary(op: IoOp) -> &'static str {
    match op {
        IoOp::Stat => "could not verify whether path exists or not",
        IoOp::Create => "error while creating file",
        IoOp::ParsePermissions => "error while parsing file permissions",
        IoOp::Chmod => "error while setting file permissions",
        IoOp::WriteContent => "error while writing file content",
        IoOp::Remove => "unable to remove file from disk",
    }
}

const fn import_summary(op: ImportOp) -> &'static str {
    match op {
        ImportOp::Open => "error opening file",
        ImportOp::Read => "error reading file",
        ImportOp::Stat => "error retrieving file info",
    }
}

/// Zero or more diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, diagnostic: impl Into<Diagnostic>) {
        self.0.push(diagnostic.into());
    }

    pub fn extend(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    pub fn has_error(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    /// First error-severity entry, if any.
    pub fn first_error(&self) -> Option<&Diagnostic> {
        self.0.iter().find(|d| d.is_error())
    }
}

impl From<StickyError> for Diagnostics {
    fn from(err: StickyError) -> Self {
        Self(vec![Diagnostic::from(err)])
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_do_not_fail_the_call() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::warning("heads up", "nothing fatal"));
        assert!(!diags.has_error());
        diags.push(Diagnostic::error("boom", "fatal"));
        assert!(diags.has_error());
        assert_eq!(diags.first_error().unwrap().summary, "boom");
    }

    #[test]
    fn io_error_maps_to_summary_and_code() {
        let err = StickyError::io(
            IoOp::Remove,
            "/tmp/x",
            std::io::Error::other("busy"),
        );
        let diag = Diagnostic::from(&err);
        assert_eq!(diag.summary, "unable to remove file from disk");
        assert_eq!(diag.detail, "busy");
        assert_eq!(diag.code, Some("STK-2001"));
        assert!(diag.attribute.is_none());
    }

    #[test]
    fn every_io_and_import_step_has_its_summary() {
        let io_cases = [
            (IoOp::Stat, "could not verify whether path exists or not"),
            (IoOp::Create, "error while creating file"),
            (IoOp::ParsePermissions, "error while parsing file permissions"),
            (IoOp::Chmod, "error while setting file permissions"),
            (IoOp::WriteContent, "error while writing file content"),
            (IoOp::Remove, "unable to remove file from disk"),
        ];
        for (op, summary) in io_cases {
            let diag = Diagnostic::from(StickyError::io(op, "/tmp/x", std::io::Error::other("e")));
            assert_eq!(diag.summary, summary, "io step {op}");
            assert!(diag.is_error());
            assert_eq!(diag.code, Some("STK-2001"));
            assert_eq!(diag.retryable, op != IoOp::ParsePermissions, "io step {op}");
        }

        let import_cases = [
            (ImportOp::Open, "error opening file"),
            (ImportOp::Read, "error reading file"),
            (ImportOp::Stat, "error retrieving file info"),
        ];
        for (op, summary) in import_cases {
            let diag =
                Diagnostic::from(StickyError::import(op, "/tmp/x", std::io::Error::other("e")));
            assert_eq!(diag.summary, summary, "import step {}", op.as_str());
            assert_eq!(diag.attribute, Some("path"));
            assert_eq!(diag.code, Some("STK-2101"));
        }
    }

    #[test]
    fn retryable_flag_is_serialized_only_when_set() {
        let err = StickyError::io(IoOp::Chmod, "/tmp/x", std::io::Error::other("busy"));
        let json = serde_json::to_value(Diagnostic::from(err)).unwrap();
        assert_eq!(json["retryable"], true);

        let json = serde_json::to_value(Diagnostic::from(StickyError::validation("path", "x")))
            .unwrap();
        assert!(json.get("retryable").is_none());
    }

    #[test]
    fn import_error_points_at_path_attribute() {
        let err = StickyError::import(
            ImportOp::Open,
            "/tmp/x",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        let diag = Diagnostic::from(err);
        assert_eq!(diag.summary, "error opening file");
        assert_eq!(diag.attribute, Some("path"));
    }

    #[test]
    fn validation_error_points_at_its_attribute() {
        let diag = Diagnostic::from(StickyError::validation("permissions", "too long"));
        assert_eq!(diag.summary, "invalid value");
        assert_eq!(diag.attribute, Some("permissions"));
    }

    #[test]
    fn serializes_without_empty_optionals() {
        let diags: Diagnostics = std::iter::once(Diagnostic::error("a", "b")).collect();
        let json = serde_json::to_string(&diags).unwrap();
        assert_eq!(json, r#"[{"severity":"error","summary":"a","detail":"b"}]"#);
    }
}
