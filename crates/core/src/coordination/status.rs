// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Diagnostic snapshot of every queue entry

use super::lock::Lock;
use super::process::Process;
use crate::id::{EntryId, ProcessId};
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

/// One queue entry as seen by [`LockManager::status`](crate::LockManager::status)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRecord {
    pub lock: String,
    pub entry: EntryId,
    pub process: ProcessId,
    pub capacity: u32,
    /// 1-based position in the lock's queue
    pub lock_position: usize,
    /// 1-based position in the owning process's entry list
    pub process_position: usize,
    /// True iff the entry lies past the grant prefix
    pub waiting: bool,
    pub waiting_since: Instant,
    pub granted_at: Option<Instant>,
}

/// Collect records lock by lock (name order), each lock in queue order
pub(crate) fn snapshot(
    locks: &BTreeMap<String, Lock>,
    processes: &HashMap<ProcessId, Process>,
) -> Vec<StatusRecord> {
    let mut records = Vec::new();

    for lock in locks.values() {
        for (index, entry) in lock.queue().iter().enumerate() {
            let process_position = processes
                .get(entry.process())
                .and_then(|p| p.position(entry.id()))
                .unwrap_or(0);

            records.push(StatusRecord {
                lock: lock.name().to_string(),
                entry: entry.id(),
                process: entry.process().clone(),
                capacity: entry.capacity(),
                lock_position: index + 1,
                process_position,
                waiting: !entry.is_granted(),
                waiting_since: entry.waiting_since(),
                granted_at: entry.granted_at(),
            });
        }
    }

    records
}
