//! Permission string validation.
//!
//! Runs on configured values, before defaulting and before any filesystem
//! access.

use crate::core::errors::{Result, StickyError};
use crate::model::value::AttrValue;

/// Highest mode a managed file may carry.
pub const MAX_MODE: u32 = 0o777;

/// Validates `permissions` as 3 or 4 digit octal notation no larger than 0777.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionsValidator {
    /// Accept an absent value (a later modifier fills it in).
    pub skip_absent: bool,
}

impl PermissionsValidator {
    pub const fn new(skip_absent: bool) -> Self {
        Self { skip_absent }
    }

    pub const fn description(&self) -> &'static str {
        "file permissions must be in numeric notation"
    }

    pub fn validate(&self, value: &AttrValue<String>) -> Result<()> {
        match value {
            AttrValue::Unknown => Ok(()),
            AttrValue::Absent if self.skip_absent => Ok(()),
            AttrValue::Absent => Err(StickyError::validation(
                "permissions",
                "file permissions cannot be empty",
            )),
            AttrValue::Present(raw) => validate_octal(raw).map(|_| ()),
        }
    }
}

/// Parse a permission string, enforcing length and range.
pub fn validate_octal(raw: &str) -> Result<u32> {
    if !(3..=4).contains(&raw.len()) {
        return Err(StickyError::validation(
            "permissions",
            format!("{raw:?}: string length should be 3 or 4 digits"),
        ));
    }

    // from_str_radix tolerates a leading '+', which is not octal notation.
    let parsed = if raw.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
        u32::from_str_radix(raw, 8).ok()
    } else {
        None
    };

    match parsed {
        Some(mode) if mode <= MAX_MODE => Ok(mode),
        _ => Err(StickyError::validation(
            "permissions",
            format!("{raw:?}: string must be expressed in octal numeric notation (e.g. \"0644\")"),
        )),
    }
}
