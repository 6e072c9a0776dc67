// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One process's outstanding request for one lock

use super::outcome::{GrantWaiter, OutcomeSlot, Resolution};
use crate::id::{EntryId, ProcessId};
use std::time::Instant;

#[derive(Debug)]
pub struct QueueEntry {
    id: EntryId,
    process: ProcessId,
    capacity: u32,
    waiting_since: Instant,
    granted_at: Option<Instant>,
    outcome: OutcomeSlot,
}

impl QueueEntry {
    pub fn new(id: EntryId, process: ProcessId, capacity: u32, now: Instant) -> Self {
        Self {
            id,
            process,
            capacity,
            waiting_since: now,
            granted_at: None,
            outcome: OutcomeSlot::new(),
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn process(&self) -> &ProcessId {
        &self.process
    }

    /// Most simultaneous holders this requester tolerates
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn waiting_since(&self) -> Instant {
        self.waiting_since
    }

    pub fn granted_at(&self) -> Option<Instant> {
        self.granted_at
    }

    pub fn is_granted(&self) -> bool {
        self.granted_at.is_some()
    }

    /// Move from waiting to granted. Returns false if already granted.
    pub(crate) fn grant(&mut self, now: Instant) -> bool {
        if self.granted_at.is_some() {
            return false;
        }
        self.granted_at = Some(now);
        self.outcome.resolve(Resolution::Granted);
        true
    }

    /// Resolve a still-waiting entry as withdrawn.
    ///
    /// Returns false for granted entries, whose outcome is already settled.
    pub(crate) fn withdraw(&mut self) -> bool {
        if self.is_granted() {
            return false;
        }
        self.outcome.resolve(Resolution::Withdrawn)
    }

    pub(crate) fn subscribe(&mut self) -> GrantWaiter {
        self.outcome.subscribe()
    }
}
