//! Configuration system: TOML file + env var overrides + defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, StickyError};

/// Full sticky configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub paths: PathsConfig,
    pub logging: LoggingConfig,
}

/// Files read and written by the reference host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Where this config was loaded from (not read from the file itself).
    #[serde(skip)]
    pub config_file: PathBuf,
    /// Desired-state manifest.
    pub manifest: PathBuf,
    /// Stored records from previous runs.
    pub state_file: PathBuf,
    pub activity_log: PathBuf,
    pub activity_log_fallback: Option<PathBuf>,
}

/// Activity log tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
    pub fsync_interval_secs: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size_bytes: 10 * 1024 * 1024,
            max_rotated_files: 3,
            fsync_interval_secs: 10,
        }
    }
}

fn home_dir() -> PathBuf {
    env::var_os("HOME").map_or_else(
        || {
            eprintln!("[STICKY-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
            PathBuf::from("/tmp")
        },
        PathBuf::from,
    )
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home = home_dir();
        let data = home.join(".local").join("share").join("sticky");
        Self {
            config_file: home.join(".config").join("sticky").join("config.toml"),
            manifest: PathBuf::from("sticky.toml"),
            state_file: data.join("state.json"),
            activity_log: data.join("activity.jsonl"),
            activity_log_fallback: None,
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// A missing file at the default path means defaults; a missing explicit
    /// path is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|e| StickyError::ConfigParse {
                context: "read",
                details: format!("{}: {e}", path_buf.display()),
            })?;
            toml::from_str::<Self>(&raw)?
        } else if path.is_some() {
            return Err(StickyError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic FNV-1a hash of the effective config, for log lines.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("STICKY_MANIFEST") {
            self.paths.manifest = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("STICKY_STATE_FILE") {
            self.paths.state_file = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("STICKY_ACTIVITY_LOG") {
            self.paths.activity_log = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("STICKY_LOGGING_ENABLED") {
            self.logging.enabled = parse_env("STICKY_LOGGING_ENABLED", &raw)?;
        }
        if let Some(raw) = lookup("STICKY_LOGGING_MAX_SIZE_BYTES") {
            self.logging.max_size_bytes = parse_env("STICKY_LOGGING_MAX_SIZE_BYTES", &raw)?;
        }
        if let Some(raw) = lookup("STICKY_LOGGING_MAX_ROTATED_FILES") {
            self.logging.max_rotated_files = parse_env("STICKY_LOGGING_MAX_ROTATED_FILES", &raw)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("paths.manifest", &self.paths.manifest),
            ("paths.state_file", &self.paths.state_file),
        ] {
            if path.as_os_str().is_empty() {
                return Err(StickyError::InvalidConfig {
                    details: format!("{name} must not be empty"),
                });
            }
        }

        if self.logging.enabled && self.paths.activity_log.as_os_str().is_empty() {
            return Err(StickyError::InvalidConfig {
                details: "paths.activity_log must not be empty when logging.enabled=true"
                    .to_string(),
            });
        }
        if self.logging.max_size_bytes == 0 {
            return Err(StickyError::InvalidConfig {
                details: "logging.max_size_bytes must be > 0".to_string(),
            });
        }
        if self.logging.max_rotated_files == 0 {
            return Err(StickyError::InvalidConfig {
                details: "logging.max_rotated_files must be >= 1".to_string(),
            });
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|error| StickyError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}
