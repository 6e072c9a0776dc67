// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-resolution outcome of a queued request
//!
//! Every entry resolves exactly once: granted by the admission scan, or
//! withdrawn by a release that arrives before the grant.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Final outcome of a lock request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Granted,
    Withdrawn,
}

impl Resolution {
    pub fn is_granted(self) -> bool {
        matches!(self, Resolution::Granted)
    }
}

#[derive(Debug)]
enum SlotState {
    Pending(Vec<oneshot::Sender<Resolution>>),
    Resolved(Resolution),
}

/// Holds an entry's resolution and the waiters that want it
#[derive(Debug)]
pub struct OutcomeSlot {
    state: SlotState,
}

impl OutcomeSlot {
    pub fn new() -> Self {
        Self {
            state: SlotState::Pending(Vec::new()),
        }
    }

    /// The stored resolution, if any
    pub fn resolution(&self) -> Option<Resolution> {
        match self.state {
            SlotState::Pending(_) => None,
            SlotState::Resolved(resolution) => Some(resolution),
        }
    }

    /// Resolve the slot and wake every waiter.
    ///
    /// Returns false if the slot was already resolved; the first resolution stands.
    pub fn resolve(&mut self, resolution: Resolution) -> bool {
        let SlotState::Pending(waiters) = &mut self.state else {
            return false;
        };
        for waiter in waiters.drain(..) {
            // Receiver may have been dropped by a caller that stopped waiting
            let _ = waiter.send(resolution);
        }
        self.state = SlotState::Resolved(resolution);
        true
    }

    /// Register interest in the resolution
    pub fn subscribe(&mut self) -> GrantWaiter {
        let (tx, rx) = oneshot::channel();
        match &mut self.state {
            SlotState::Pending(waiters) => waiters.push(tx),
            SlotState::Resolved(resolution) => {
                let _ = tx.send(*resolution);
            }
        }
        GrantWaiter { rx }
    }
}

impl Default for OutcomeSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Suspends a caller until its entry resolves
#[derive(Debug)]
pub struct GrantWaiter {
    rx: oneshot::Receiver<Resolution>,
}

impl GrantWaiter {
    /// Wait for the resolution.
    ///
    /// If the owning manager is dropped first, the entry counts as withdrawn.
    pub async fn wait(self) -> Resolution {
        self.rx.await.unwrap_or(Resolution::Withdrawn)
    }
}

#[cfg(test)]
#[path = "outcome_tests.rs"]
mod tests;
