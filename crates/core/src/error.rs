// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors raised by lock coordination

use crate::id::{EntryId, ProcessId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Faults raised synchronously by [`LockManager`](crate::LockManager) operations.
///
/// A rejected operation never leaves partial state behind: a deadlocked request
/// is rolled back before the error is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    #[error("process {process} is already waiting on lock {lock}")]
    AlreadyWaiting { process: ProcessId, lock: String },

    #[error("deadlock: process {process} cannot wait on lock {lock}")]
    Deadlock { process: ProcessId, lock: String },

    #[error("no such entry: {0}")]
    NoSuchEntry(EntryId),

    #[error("invalid capacity {capacity} for lock {lock}: must be at least 1")]
    InvalidCapacity { lock: String, capacity: u32 },
}

/// Wire-friendly classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    AlreadyWaiting,
    Deadlock,
    NoSuchEntry,
    InvalidCapacity,
    AwaitInFlight,
    Protocol,
}

impl LockError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LockError::AlreadyWaiting { .. } => ErrorKind::AlreadyWaiting,
            LockError::Deadlock { .. } => ErrorKind::Deadlock,
            LockError::NoSuchEntry(_) => ErrorKind::NoSuchEntry,
            LockError::InvalidCapacity { .. } => ErrorKind::InvalidCapacity,
        }
    }
}
