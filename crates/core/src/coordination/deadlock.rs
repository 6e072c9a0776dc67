// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deadlock detection for a request that is about to wait
//!
//! Two strategies:
//! - **Chain chase**: follow `blocked on lock -> lock's head holder -> holder's
//!   wait target` from the requester. Exact while every lock on the chain is
//!   headed by a capacity-1 entry.
//! - **Graph reduction**: mark processes that can eventually proceed as safe,
//!   drop their entries from capacity accounting, repeat until nothing changes.
//!   Anything still over capacity at the fixpoint is deadlocked.
//!
//! The chase runs first and hands over to reduction as soon as it meets a
//! semaphore.

use super::lock::Lock;
use super::process::Process;
use super::window::CapacityWindow;
use crate::event::DetectionStrategy;
use crate::id::ProcessId;
use std::collections::{BTreeMap, HashMap, HashSet};

/// What the detector concluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    /// Strategy that proved a deadlock, if one was found
    pub deadlock: Option<DetectionStrategy>,
    /// Whether the chain chase handed over to graph reduction
    pub escalated: bool,
}

impl Detection {
    pub fn is_deadlock(&self) -> bool {
        self.deadlock.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chain {
    /// The chain led back to the requester
    Cycle,
    /// The chain reached a process that is not waiting
    Ends,
    /// A semaphore (or an over-long chain) needs the thorough check
    Escalate,
}

/// Read-only view over the manager's locks and processes
pub struct DeadlockDetector<'a> {
    locks: &'a BTreeMap<String, Lock>,
    processes: &'a HashMap<ProcessId, Process>,
}

impl<'a> DeadlockDetector<'a> {
    pub fn new(
        locks: &'a BTreeMap<String, Lock>,
        processes: &'a HashMap<ProcessId, Process>,
    ) -> Self {
        Self { locks, processes }
    }

    /// Check whether `requester`, already marked blocked, completes a deadlock
    pub fn check(&self, requester: &ProcessId) -> Detection {
        match self.chase(requester) {
            Chain::Cycle => Detection {
                deadlock: Some(DetectionStrategy::Chain),
                escalated: false,
            },
            Chain::Ends => Detection {
                deadlock: None,
                escalated: false,
            },
            Chain::Escalate => Detection {
                deadlock: self.reduce().then_some(DetectionStrategy::Reduction),
                escalated: true,
            },
        }
    }

    fn chase(&self, requester: &ProcessId) -> Chain {
        let mut current = requester;

        for _ in 0..=self.processes.len() {
            let Some(lock) = self
                .processes
                .get(current)
                .and_then(Process::blocked_on)
                .and_then(|name| self.locks.get(name))
            else {
                return Chain::Ends;
            };
            let Some(head) = lock.front() else {
                return Chain::Ends;
            };

            // Any other holder inside a wider window could be the one to vacate
            if head.capacity() != 1 {
                return Chain::Escalate;
            }

            let holder = head.process();
            if holder == requester {
                return Chain::Cycle;
            }
            match self.processes.get(holder) {
                Some(next) if next.is_blocked() => current = holder,
                _ => return Chain::Ends,
            }
        }

        // A cycle that does not pass through the requester
        Chain::Escalate
    }

    /// Returns true if some lock stays over capacity once every process that
    /// can proceed has been discounted.
    fn reduce(&self) -> bool {
        let mut safe: HashSet<&ProcessId> = self
            .processes
            .values()
            .filter(|p| !p.is_blocked())
            .map(Process::id)
            .collect();

        // Each productive pass marks at least one more process safe
        loop {
            let mut changed = false;
            let mut unresolved = false;

            for lock in self.locks.values() {
                let mut window = CapacityWindow::new();
                for entry in lock.queue() {
                    let owner = entry.process();
                    if safe.contains(owner) {
                        continue;
                    }
                    if !window.admits(entry.capacity()) {
                        unresolved = true;
                        break;
                    }
                    // Only the entry the owner is waiting on proves it can proceed
                    if !entry.is_granted() && self.is_blocked_on(owner, lock.name()) {
                        safe.insert(owner);
                        changed = true;
                    }
                }
            }

            if !changed {
                return unresolved;
            }
        }
    }

    fn is_blocked_on(&self, process: &ProcessId, lock: &str) -> bool {
        self.processes
            .get(process)
            .is_some_and(|p| p.is_blocked_on(lock))
    }
}

#[cfg(test)]
#[path = "deadlock_tests.rs"]
mod tests;
