// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named lock: an arrival-ordered queue plus the admission scan
//!
//! Capacity is a per-requester ceiling on simultaneous holders. A capacity-1
//! request behaves as a mutex and capacity N as an N-way semaphore; mixed
//! requests are admitted under the tightest ceiling seen so far, so no entry is
//! ever overtaken by a later, less demanding one.

use super::entry::QueueEntry;
use super::window::CapacityWindow;
use crate::id::EntryId;
use std::time::Instant;

/// Result of an admission scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Admission {
    /// Entries granted by this scan, in queue order
    pub granted: Vec<EntryId>,
    /// False if some entry is still waiting past the grant prefix
    pub fully_resolved: bool,
}

#[derive(Debug)]
pub struct Lock {
    name: String,
    queue: Vec<QueueEntry>,
}

impl Lock {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queue: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entries in arrival order
    pub fn queue(&self) -> &[QueueEntry] {
        &self.queue
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Head of the queue; always granted when present
    pub fn front(&self) -> Option<&QueueEntry> {
        self.queue.first()
    }

    /// Number of entries currently holding the lock
    pub fn granted_len(&self) -> usize {
        self.queue.iter().take_while(|e| e.is_granted()).count()
    }

    pub fn get(&self, id: EntryId) -> Option<&QueueEntry> {
        self.queue.iter().find(|e| e.id() == id)
    }

    pub(crate) fn get_mut(&mut self, id: EntryId) -> Option<&mut QueueEntry> {
        self.queue.iter_mut().find(|e| e.id() == id)
    }

    /// 1-based queue position of an entry
    pub fn position(&self, id: EntryId) -> Option<usize> {
        self.queue.iter().position(|e| e.id() == id).map(|i| i + 1)
    }

    pub(crate) fn push(&mut self, entry: QueueEntry) {
        self.queue.push(entry);
    }

    /// Remove an entry from anywhere in the queue
    pub(crate) fn remove(&mut self, id: EntryId) -> Option<QueueEntry> {
        let index = self.queue.iter().position(|e| e.id() == id)?;
        Some(self.queue.remove(index))
    }

    /// Grant every entry inside the running-minimum window.
    ///
    /// Already-granted entries are left alone; newly granted entries have their
    /// outcome resolved here.
    pub(crate) fn admit(&mut self, now: Instant) -> Admission {
        let mut window = CapacityWindow::new();
        let mut admission = Admission {
            granted: Vec::new(),
            fully_resolved: true,
        };

        for entry in &mut self.queue {
            if !window.admits(entry.capacity()) {
                admission.fully_resolved = false;
                break;
            }
            if entry.grant(now) {
                admission.granted.push(entry.id());
            }
        }

        admission
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
