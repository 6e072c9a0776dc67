// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A connected client and the entries it owns

use crate::id::{EntryId, ProcessId};

#[derive(Debug, Clone)]
pub struct Process {
    id: ProcessId,
    /// Owned entries in request order, across any number of locks
    entries: Vec<EntryId>,
    /// Lock this process is waiting on, if any
    blocked_on: Option<String>,
}

impl Process {
    pub fn new(id: ProcessId) -> Self {
        Self {
            id,
            entries: Vec::new(),
            blocked_on: None,
        }
    }

    pub fn id(&self) -> &ProcessId {
        &self.id
    }

    pub fn entries(&self) -> &[EntryId] {
        &self.entries
    }

    pub fn blocked_on(&self) -> Option<&str> {
        self.blocked_on.as_deref()
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked_on.is_some()
    }

    pub fn is_blocked_on(&self, lock: &str) -> bool {
        self.blocked_on.as_deref() == Some(lock)
    }

    /// 1-based position of an entry in this process's own list
    pub fn position(&self, entry: EntryId) -> Option<usize> {
        self.entries.iter().position(|e| *e == entry).map(|i| i + 1)
    }

    pub(crate) fn add_entry(&mut self, entry: EntryId) {
        self.entries.push(entry);
    }

    pub(crate) fn remove_entry(&mut self, entry: EntryId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| *e != entry);
        self.entries.len() != before
    }

    pub(crate) fn block_on(&mut self, lock: &str) {
        self.blocked_on = Some(lock.to_string());
    }

    /// Clear the wait target if it is `lock`
    pub(crate) fn unblock_from(&mut self, lock: &str) {
        if self.is_blocked_on(lock) {
            self.blocked_on = None;
        }
    }
}
