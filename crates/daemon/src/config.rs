// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration
//!
//! Read from an optional TOML file; anything left out falls back to paths under
//! the user's state directory.
//!
//! ```toml
//! socket_path = "/tmp/latch/latchd.sock"
//! log_filter = "latch=debug"
//! io_timeout = "5s"
//! grant_timeout = "10m"
//!
//! [coordinator]
//! detect_deadlocks = true
//! ```

use latch_core::CoordinatorConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "LATCH_CONFIG";

const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("could not determine state directory (set XDG_STATE_HOME or HOME)")]
    NoStateDir,
}

/// On-disk shape; every field optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    socket_path: Option<PathBuf>,
    lock_path: Option<PathBuf>,
    log_path: Option<PathBuf>,
    log_filter: Option<String>,
    #[serde(default, with = "humantime_serde")]
    io_timeout: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    grant_timeout: Option<Duration>,
    #[serde(default)]
    coordinator: CoordinatorConfig,
}

/// Resolved daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Default `EnvFilter` directive; `RUST_LOG` overrides it
    pub log_filter: String,
    /// Deadline for writing a response to a client
    pub io_timeout: Duration,
    /// Release waiting entries on the client's behalf after this long
    pub grant_timeout: Option<Duration>,
    pub coordinator: CoordinatorConfig,
}

impl DaemonConfig {
    /// Load from `path`, or from defaults alone when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Self::resolve(ConfigFile::default());
        };
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Self::resolve(toml::from_str(content)?)
    }

    /// Keep every file the daemon touches inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            socket_path: dir.join("latchd.sock"),
            lock_path: dir.join("latchd.pid"),
            log_path: dir.join("latchd.log"),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            io_timeout: DEFAULT_IO_TIMEOUT,
            grant_timeout: None,
            coordinator: CoordinatorConfig::default(),
        }
    }

    fn resolve(file: ConfigFile) -> Result<Self, ConfigError> {
        let socket_path = match file.socket_path {
            Some(path) => path,
            None => socket_dir()?.join("latchd.sock"),
        };
        let lock_path = match file.lock_path {
            Some(path) => path,
            None => state_dir()?.join("latchd.pid"),
        };
        let log_path = match file.log_path {
            Some(path) => path,
            None => state_dir()?.join("latchd.log"),
        };

        Ok(Self {
            socket_path,
            lock_path,
            log_path,
            log_filter: file
                .log_filter
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            io_timeout: file.io_timeout.unwrap_or(DEFAULT_IO_TIMEOUT),
            grant_timeout: file.grant_timeout,
            coordinator: file.coordinator,
        })
    }
}

/// State directory for latch
fn state_dir() -> Result<PathBuf, ConfigError> {
    // Use XDG_STATE_HOME or default to ~/.local/state
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("latch"));
    }

    let home = std::env::var("HOME").map_err(|_| ConfigError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/latch"))
}

/// Socket directory for latch
///
/// Uses /tmp/latch by default to keep paths short (macOS SUN_LEN = 104).
/// Can be overridden with LATCH_SOCKET_DIR.
fn socket_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("LATCH_SOCKET_DIR") {
        return Ok(PathBuf::from(dir));
    }
    Ok(PathBuf::from("/tmp/latch"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
