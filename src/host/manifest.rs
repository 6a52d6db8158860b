//! Desired-state manifest: named `[files.<name>]` tables in TOML.
//!
//! ```toml
//! [files.motd]
//! path = "/etc/motd"
//! content = "welcome\n"
//! permissions = "0644"   # optional, defaults to 0666
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::core::errors::{Result, StickyError};
use crate::model::file::FileConfig;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    #[serde(default)]
    files: BTreeMap<String, RawEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntry {
    path: Option<String>,
    content: Option<String>,
    permissions: Option<String>,
}

/// Configured files keyed by resource name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub files: BTreeMap<String, FileConfig>,
}

impl Manifest {
    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StickyError::MissingConfig {
                    path: path.to_path_buf(),
                }
            } else {
                StickyError::ConfigParse {
                    context: "manifest",
                    details: format!("{}: {e}", path.display()),
                }
            }
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let parsed: RawManifest = toml::from_str(raw).map_err(|e| StickyError::ConfigParse {
            context: "manifest",
            details: e.to_string(),
        })?;
        let files = parsed
            .files
            .into_iter()
            .map(|(name, entry)| {
                let config = FileConfig {
                    path: entry.path.into(),
                    content: entry.content.into(),
                    permissions: entry.permissions.into(),
                };
                (name, config)
            })
            .collect();
        Ok(Self { files })
    }
}
