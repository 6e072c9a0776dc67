// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock manager: the single authority for every lock and client process
//!
//! Each public operation is one uninterrupted step over the lock registry and
//! process set. Callers serialize access (see [`LockService`](crate::LockService));
//! the only suspension point is waiting on a [`GrantWaiter`].

use super::deadlock::DeadlockDetector;
use super::entry::QueueEntry;
use super::lock::Lock;
use super::outcome::GrantWaiter;
use super::process::Process;
use super::status::{self, StatusRecord};
use crate::clock::{Clock, SystemClock};
use crate::config::CoordinatorConfig;
use crate::error::LockError;
use crate::event::LockEvent;
use crate::id::{EntryId, EntryIdGen, ProcessId};
use crate::observer::{LockObserver, TracingObserver};
use std::collections::{BTreeMap, HashMap};

/// Result of [`LockManager::request_lock`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Granted on arrival
    Granted(EntryId),
    /// Queued; await the entry to learn its outcome
    Queued(EntryId),
    /// Fail-fast request that would have had to wait; nothing was queued
    WouldBlock,
}

impl RequestOutcome {
    pub fn entry(&self) -> Option<EntryId> {
        match self {
            RequestOutcome::Granted(id) | RequestOutcome::Queued(id) => Some(*id),
            RequestOutcome::WouldBlock => None,
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, RequestOutcome::Granted(_))
    }
}

pub struct LockManager<C: Clock = SystemClock, O: LockObserver = TracingObserver> {
    config: CoordinatorConfig,
    /// Live locks by name; a lock exists only while its queue is non-empty
    locks: BTreeMap<String, Lock>,
    /// Processes that own at least one entry
    processes: HashMap<ProcessId, Process>,
    /// Lock each live entry is queued on
    entries: HashMap<EntryId, String>,
    ids: EntryIdGen,
    clock: C,
    observer: O,
}

impl LockManager {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self::with_parts(config, SystemClock, TracingObserver)
    }
}

impl<C: Clock, O: LockObserver> LockManager<C, O> {
    pub fn with_parts(config: CoordinatorConfig, clock: C, observer: O) -> Self {
        Self {
            config,
            locks: BTreeMap::new(),
            processes: HashMap::new(),
            entries: HashMap::new(),
            ids: EntryIdGen::new(),
            clock,
            observer,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Queue a request for `capacity`-way access to `lock`.
    ///
    /// A request that cannot be granted immediately is withdrawn again if
    /// `fail_fast` is set, or if waiting would deadlock.
    pub fn request_lock(
        &mut self,
        process: &ProcessId,
        lock: &str,
        capacity: u32,
        fail_fast: bool,
    ) -> Result<RequestOutcome, LockError> {
        if capacity == 0 {
            return Err(LockError::InvalidCapacity {
                lock: lock.to_string(),
                capacity,
            });
        }
        if let Some(waiting) = self.processes.get(process).and_then(Process::blocked_on) {
            return Err(LockError::AlreadyWaiting {
                process: process.clone(),
                lock: waiting.to_string(),
            });
        }

        let now = self.clock.now();
        let id = self.ids.next_id();
        let queue = self
            .locks
            .entry(lock.to_string())
            .or_insert_with(|| Lock::new(lock));
        queue.push(QueueEntry::new(id, process.clone(), capacity, now));
        let admission = queue.admit(now);

        self.entries.insert(id, lock.to_string());
        self.processes
            .entry(process.clone())
            .or_insert_with(|| Process::new(process.clone()))
            .add_entry(id);
        self.report_grants(lock, &admission.granted);

        if admission.granted.contains(&id) {
            return Ok(RequestOutcome::Granted(id));
        }

        if fail_fast {
            self.roll_back(lock, id);
            self.observer.observe(&LockEvent::Denied {
                lock: lock.to_string(),
                process: process.clone(),
                capacity,
            });
            return Ok(RequestOutcome::WouldBlock);
        }

        if let Some(owner) = self.processes.get_mut(process) {
            owner.block_on(lock);
        }

        if self.config.detect_deadlocks {
            let detection = DeadlockDetector::new(&self.locks, &self.processes).check(process);
            if detection.escalated {
                self.observer.observe(&LockEvent::DetectorEscalated {
                    lock: lock.to_string(),
                    process: process.clone(),
                });
            }
            if let Some(strategy) = detection.deadlock {
                self.roll_back(lock, id);
                self.observer.observe(&LockEvent::DeadlockDetected {
                    lock: lock.to_string(),
                    process: process.clone(),
                    strategy,
                });
                return Err(LockError::Deadlock {
                    process: process.clone(),
                    lock: lock.to_string(),
                });
            }
        }

        let position = self
            .locks
            .get(lock)
            .and_then(|q| q.position(id))
            .unwrap_or_default();
        self.observer.observe(&LockEvent::Queued {
            lock: lock.to_string(),
            process: process.clone(),
            entry: id,
            capacity,
            position,
        });
        Ok(RequestOutcome::Queued(id))
    }

    /// Subscribe to an entry's outcome.
    ///
    /// The returned waiter resolves to granted once the entry joins the grant
    /// prefix (immediately, if it already has), or to withdrawn if the entry is
    /// released first.
    pub fn await_grant(&mut self, id: EntryId) -> Result<GrantWaiter, LockError> {
        let lock = self.entries.get(&id).ok_or(LockError::NoSuchEntry(id))?;
        self.locks
            .get_mut(lock)
            .and_then(|queue| queue.get_mut(id))
            .map(QueueEntry::subscribe)
            .ok_or(LockError::NoSuchEntry(id))
    }

    /// Remove an entry, granted or still waiting, and admit whoever can now
    /// hold the lock.
    pub fn release_lock(&mut self, id: EntryId) -> Result<(), LockError> {
        let lock = self.entries.remove(&id).ok_or(LockError::NoSuchEntry(id))?;
        let now = self.clock.now();

        let Some(queue) = self.locks.get_mut(&lock) else {
            return Err(LockError::NoSuchEntry(id));
        };
        let Some(mut entry) = queue.remove(id) else {
            return Err(LockError::NoSuchEntry(id));
        };
        let withdrawn = entry.withdraw();
        let admission = queue.admit(now);
        if queue.is_empty() {
            self.locks.remove(&lock);
        }

        let process = entry.process().clone();
        if let Some(owner) = self.processes.get_mut(&process) {
            owner.remove_entry(id);
            if withdrawn {
                owner.unblock_from(&lock);
            }
            if owner.entries().is_empty() {
                self.processes.remove(&process);
            }
        }

        let event = match entry.granted_at() {
            Some(granted_at) => LockEvent::Released {
                lock: lock.clone(),
                process,
                entry: id,
                held: now.saturating_duration_since(granted_at),
            },
            None => LockEvent::Withdrawn {
                lock: lock.clone(),
                process,
                entry: id,
            },
        };
        self.observer.observe(&event);
        self.report_grants(&lock, &admission.granted);

        Ok(())
    }

    /// Release everything a departing process still owns.
    ///
    /// Returns the number of entries released.
    pub fn disconnect(&mut self, process: &ProcessId) -> usize {
        let owned = self
            .processes
            .get(process)
            .map(|p| p.entries().to_vec())
            .unwrap_or_default();

        let mut released = 0;
        for id in owned {
            if self.release_lock(id).is_ok() {
                released += 1;
            }
        }

        self.observer.observe(&LockEvent::ProcessDisconnected {
            process: process.clone(),
            released,
        });
        released
    }

    /// Snapshot of every queue entry; no side effects
    pub fn status(&self) -> Vec<StatusRecord> {
        status::snapshot(&self.locks, &self.processes)
    }

    pub fn lock(&self, name: &str) -> Option<&Lock> {
        self.locks.get(name)
    }

    pub fn lock_names(&self) -> Vec<String> {
        self.locks.keys().cloned().collect()
    }

    /// Entries queued on a lock, granted or not
    pub fn queue_len(&self, lock: &str) -> usize {
        self.locks.get(lock).map_or(0, Lock::len)
    }

    pub fn process(&self, id: &ProcessId) -> Option<&Process> {
        self.processes.get(id)
    }

    pub fn process_ids(&self) -> Vec<ProcessId> {
        self.processes.keys().cloned().collect()
    }

    pub fn blocked_on(&self, process: &ProcessId) -> Option<&str> {
        self.processes.get(process).and_then(Process::blocked_on)
    }

    pub fn entries_of(&self, process: &ProcessId) -> Vec<EntryId> {
        self.processes
            .get(process)
            .map(|p| p.entries().to_vec())
            .unwrap_or_default()
    }

    /// Whether a live entry is granted; `None` for unknown entries
    pub fn is_granted(&self, id: EntryId) -> Option<bool> {
        let lock = self.entries.get(&id)?;
        self.locks
            .get(lock)
            .and_then(|queue| queue.get(id))
            .map(QueueEntry::is_granted)
    }

    /// Undo a request that never made it out of the waiting state
    fn roll_back(&mut self, lock: &str, id: EntryId) {
        self.entries.remove(&id);

        let mut process = None;
        if let Some(queue) = self.locks.get_mut(lock) {
            if let Some(mut entry) = queue.remove(id) {
                entry.withdraw();
                process = Some(entry.process().clone());
            }
            if queue.is_empty() {
                self.locks.remove(lock);
            }
        }

        let Some(process) = process else {
            return;
        };
        if let Some(owner) = self.processes.get_mut(&process) {
            owner.remove_entry(id);
            owner.unblock_from(lock);
            if owner.entries().is_empty() {
                self.processes.remove(&process);
            }
        }
    }

    /// Clear wait targets of newly granted entries and report the grants
    fn report_grants(&mut self, lock: &str, granted: &[EntryId]) {
        let Some(queue) = self.locks.get(lock) else {
            return;
        };
        for id in granted {
            let Some(entry) = queue.get(*id) else {
                continue;
            };
            if let Some(owner) = self.processes.get_mut(entry.process()) {
                owner.unblock_from(lock);
            }
            let waited = entry
                .granted_at()
                .map(|at| at.saturating_duration_since(entry.waiting_since()))
                .unwrap_or_default();
            self.observer.observe(&LockEvent::Acquired {
                lock: lock.to_string(),
                process: entry.process().clone(),
                entry: *id,
                capacity: entry.capacity(),
                waited,
            });
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
