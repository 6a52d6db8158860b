//! The managed file record and its configured (pre-plan) form.

use serde::{Deserialize, Serialize};

use super::value::AttrValue;

/// Fully resolved desired/stored state of one managed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManagedFile {
    /// Where the file lives. Changing it means destroy + create.
    pub path: String,
    /// Exact bytes written to the file.
    pub content: String,
    /// Octal mode string, 3 or 4 digits.
    pub permissions: String,
}

impl ManagedFile {
    pub fn new(
        path: impl Into<String>,
        content: impl Into<String>,
        permissions: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            permissions: permissions.into(),
        }
    }
}

/// Configured attributes of a managed file, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileConfig {
    pub path: AttrValue<String>,
    pub content: AttrValue<String>,
    pub permissions: AttrValue<String>,
}

impl FileConfig {
    /// Config with every attribute set.
    pub fn new(
        path: impl Into<String>,
        content: impl Into<String>,
        permissions: Option<&str>,
    ) -> Self {
        Self {
            path: AttrValue::Present(path.into()),
            content: AttrValue::Present(content.into()),
            permissions: permissions.map(str::to_string).into(),
        }
    }
}

impl From<&ManagedFile> for FileConfig {
    fn from(file: &ManagedFile) -> Self {
        Self {
            path: AttrValue::Present(file.path.clone()),
            content: AttrValue::Present(file.content.clone()),
            permissions: AttrValue::Present(file.permissions.clone()),
        }
    }
}
