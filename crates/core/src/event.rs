// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events emitted by the lock manager for observers

use crate::id::{EntryId, ProcessId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which deadlock check proved a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStrategy {
    /// Wait-for chain chase through pure mutexes
    Chain,
    /// Graph reduction over every lock queue
    Reduction,
}

impl std::fmt::Display for DetectionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionStrategy::Chain => write!(f, "chain"),
            DetectionStrategy::Reduction => write!(f, "reduction"),
        }
    }
}

/// Things that happened inside the manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockEvent {
    /// A request could not be granted and is waiting in the queue
    Queued {
        lock: String,
        process: ProcessId,
        entry: EntryId,
        capacity: u32,
        /// 1-based position in the lock's queue
        position: usize,
    },

    /// An entry joined the grant prefix
    Acquired {
        lock: String,
        process: ProcessId,
        entry: EntryId,
        capacity: u32,
        waited: Duration,
    },

    /// A fail-fast request would have had to wait
    Denied {
        lock: String,
        process: ProcessId,
        capacity: u32,
    },

    /// An entry was released before it was ever granted
    Withdrawn {
        lock: String,
        process: ProcessId,
        entry: EntryId,
    },

    /// A granted entry was released
    Released {
        lock: String,
        process: ProcessId,
        entry: EntryId,
        held: Duration,
    },

    /// The chain chase hit a semaphore and handed over to graph reduction
    DetectorEscalated { lock: String, process: ProcessId },

    /// A request was rejected because waiting would deadlock
    DeadlockDetected {
        lock: String,
        process: ProcessId,
        strategy: DetectionStrategy,
    },

    /// A process was torn down and its entries released
    ProcessDisconnected { process: ProcessId, released: usize },
}

impl LockEvent {
    /// Stable event name, e.g. `lock:acquired`
    pub fn name(&self) -> &'static str {
        match self {
            LockEvent::Queued { .. } => "lock:queued",
            LockEvent::Acquired { .. } => "lock:acquired",
            LockEvent::Denied { .. } => "lock:denied",
            LockEvent::Withdrawn { .. } => "lock:withdrawn",
            LockEvent::Released { .. } => "lock:released",
            LockEvent::DetectorEscalated { .. } => "deadlock:escalated",
            LockEvent::DeadlockDetected { .. } => "deadlock:detected",
            LockEvent::ProcessDisconnected { .. } => "process:disconnected",
        }
    }

    /// Lock this event concerns, if any
    pub fn lock(&self) -> Option<&str> {
        match self {
            LockEvent::Queued { lock, .. }
            | LockEvent::Acquired { lock, .. }
            | LockEvent::Denied { lock, .. }
            | LockEvent::Withdrawn { lock, .. }
            | LockEvent::Released { lock, .. }
            | LockEvent::DetectorEscalated { lock, .. }
            | LockEvent::DeadlockDetected { lock, .. } => Some(lock),
            LockEvent::ProcessDisconnected { .. } => None,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
