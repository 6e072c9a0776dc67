// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Observers receive [`LockEvent`]s from the manager
//!
//! The admission scan and deadlock detector never log directly; the manager hands
//! every event to its observer once the operation's state change is complete.

use crate::event::LockEvent;

/// Sink for manager events
pub trait LockObserver: Send + Sync {
    fn observe(&self, event: &LockEvent);
}

/// Observer that discards every event
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpObserver;

impl LockObserver for NoOpObserver {
    fn observe(&self, _event: &LockEvent) {}
}

/// Observer that reports events as structured `tracing` records
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl LockObserver for TracingObserver {
    fn observe(&self, event: &LockEvent) {
        match event {
            LockEvent::Queued {
                lock,
                process,
                entry,
                capacity,
                position,
            } => tracing::debug!(
                %lock, %process, %entry, capacity, position,
                "waiting for lock"
            ),
            LockEvent::Acquired {
                lock,
                process,
                entry,
                capacity,
                waited,
            } => tracing::debug!(
                %lock, %process, %entry, capacity,
                waited_ms = waited.as_millis() as u64,
                "lock granted"
            ),
            LockEvent::Denied {
                lock,
                process,
                capacity,
            } => tracing::debug!(%lock, %process, capacity, "lock busy, fail-fast request denied"),
            LockEvent::Withdrawn {
                lock,
                process,
                entry,
            } => tracing::debug!(%lock, %process, %entry, "request withdrawn before grant"),
            LockEvent::Released {
                lock,
                process,
                entry,
                held,
            } => tracing::debug!(
                %lock, %process, %entry,
                held_ms = held.as_millis() as u64,
                "lock released"
            ),
            LockEvent::DetectorEscalated { lock, process } => {
                tracing::debug!(%lock, %process, "semaphore in wait chain, running graph reduction")
            }
            LockEvent::DeadlockDetected {
                lock,
                process,
                strategy,
            } => tracing::warn!(%lock, %process, %strategy, "deadlock detected, request rejected"),
            LockEvent::ProcessDisconnected { process, released } => {
                tracing::info!(%process, released, "process disconnected")
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use recording::RecordingObserver;

#[cfg(any(test, feature = "test-support"))]
mod recording {
    #![cfg_attr(coverage_nightly, coverage(off))]

    use super::LockObserver;
    use crate::event::LockEvent;
    use std::sync::{Arc, Mutex};

    /// Observer that records events for assertions
    #[derive(Clone, Debug, Default)]
    pub struct RecordingObserver {
        events: Arc<Mutex<Vec<LockEvent>>>,
    }

    impl RecordingObserver {
        pub fn new() -> Self {
            Self::default()
        }

        /// All events observed so far
        pub fn events(&self) -> Vec<LockEvent> {
            self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
        }

        /// Names of all events observed so far
        pub fn names(&self) -> Vec<&'static str> {
            self.events().iter().map(LockEvent::name).collect()
        }

        pub fn clear(&self) {
            self.events.lock().unwrap_or_else(|e| e.into_inner()).clear();
        }
    }

    impl LockObserver for RecordingObserver {
        fn observe(&self, event: &LockEvent) {
            self.events
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(event.clone());
        }
    }
}
