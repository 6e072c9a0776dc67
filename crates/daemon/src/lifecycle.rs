// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and shutdown.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use latch_core::{LockManager, LockService};
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::config::{ConfigError, DaemonConfig};

/// Daemon state during operation
pub struct DaemonState {
    pub config: DaemonConfig,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Unix socket listener
    pub listener: UnixListener,
    /// Coordinator shared by every connection
    pub service: LockService,
    /// When daemon started
    pub start_time: Instant,
    /// Signalled by a client `Shutdown` request
    pub shutdown: Arc<Notify>,
}

impl DaemonState {
    /// Shutdown the daemon gracefully
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        let held = self.service.status().len();
        if held > 0 {
            warn!(entries = held, "shutting down with outstanding lock entries");
        }

        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("Failed to remove socket file: {}", e);
            }
        }

        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        // Lock file is released automatically when self.lock_file is dropped

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Invalid log path: {0}")]
    InvalidLogPath(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &DaemonConfig) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config).await {
        Ok(state) => Ok(state),
        Err(e) => {
            // A second daemon losing the lock race must not remove the
            // running daemon's files
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(config: &DaemonConfig) -> Result<DaemonState, LifecycleError> {
    // 1. Create directories
    for path in [&config.socket_path, &config.lock_path] {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // 2. Acquire lock file FIRST - prevents races
    let lock_file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    // Write PID to lock file
    use std::io::Write;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // 3. Remove stale socket and bind (LAST - only after all validation passes)
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    let service = LockService::new(LockManager::new(config.coordinator.clone()));

    info!(
        detect_deadlocks = config.coordinator.detect_deadlocks,
        grant_timeout = ?config.grant_timeout,
        "Daemon started"
    );

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        listener,
        service,
        start_time: Instant::now(),
        shutdown: Arc::new(Notify::new()),
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &DaemonConfig) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }

    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
