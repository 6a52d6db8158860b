//! JSON state store holding the records returned by previous lifecycle calls.
//!
//! Saved atomically: write to `<file>.tmp`, fsync, then `rename()` over the
//! live file.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, StickyError};
use crate::model::file::ManagedFile;
use crate::resource::reconciler::StateChange;

const STORE_VERSION: u32 = 1;

/// Stored records keyed by resource name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateStore {
    version: u32,
    resources: BTreeMap<String, ManagedFile>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self {
            version: STORE_VERSION,
            resources: BTreeMap::new(),
        }
    }
}

impl StateStore {
    /// Load the store; a missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(StickyError::Runtime {
                    details: format!("read state file {}: {e}", path.display()),
                });
            }
        };
        let store: Self = serde_json::from_str(&raw)?;
        if store.version != STORE_VERSION {
            return Err(StickyError::Serialization {
                context: "state store",
                details: format!(
                    "unsupported state version {} (expected {STORE_VERSION})",
                    store.version
                ),
            });
        }
        Ok(store)
    }

    /// Persist the store atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(path, json.as_bytes()).map_err(|e| StickyError::Runtime {
            details: format!("write state file {}: {e}", path.display()),
        })
    }

    pub fn get(&self, name: &str) -> Option<&ManagedFile> {
        self.resources.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.resources.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ManagedFile)> {
        self.resources.iter()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn insert(&mut self, name: impl Into<String>, file: ManagedFile) {
        self.resources.insert(name.into(), file);
    }

    /// Apply what a lifecycle call decided about `name`.
    pub fn apply(&mut self, name: &str, change: StateChange) {
        match change {
            StateChange::Set(file) => {
                self.resources.insert(name.to_string(), file);
            }
            StateChange::Keep => {}
            StateChange::Remove => {
                self.resources.remove(name);
            }
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    let result = (|| {
        {
            let mut opts = OpenOptions::new();
            opts.write(true).create(true).truncate(true);
            // Owner-only: records carry file content.
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt as _;
                opts.mode(0o600);
            }
            let mut file = opts.open(&tmp_path)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::load(&dir.path().join("state.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn save_then_load_preserves_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let mut store = StateStore::default();
        store.insert("motd", ManagedFile::new("/tmp/motd", "hi\n", "0644"));
        store.save(&path).unwrap();

        let loaded = StateStore::load(&path).unwrap();
        assert_eq!(loaded, store);
        assert!(!dir.path().join("nested").join("state.json.tmp").exists());
    }

    #[test]
    #[cfg(unix)]
    fn saved_state_is_owner_only() {
        use std::os::unix::fs::PermissionsExt as _;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        StateStore::default().save(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn unsupported_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"version":99,"resources":{}}"#).unwrap();
        let err = StateStore::load(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported state version"));
    }

    #[test]
    fn corrupt_json_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();
        assert_eq!(StateStore::load(&path).unwrap_err().code(), "STK-3001");
    }

    #[test]
    fn apply_follows_state_change() {
        let mut store = StateStore::default();
        let file = ManagedFile::new("/tmp/a", "x", "0644");
        store.apply("a", StateChange::Set(file.clone()));
        assert_eq!(store.get("a"), Some(&file));
        store.apply("a", StateChange::Keep);
        assert!(store.contains("a"));
        store.apply("a", StateChange::Remove);
        assert!(!store.contains("a"));
    }
}
