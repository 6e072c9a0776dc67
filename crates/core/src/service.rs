// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared handle to a lock manager for concurrent callers
//!
//! Every call takes the manager mutex for one uninterrupted step. Waiting for a
//! grant happens after the mutex is released, so one suspended caller never
//! stalls the others.

use crate::clock::{Clock, SystemClock};
use crate::coordination::{LockManager, RequestOutcome, Resolution, StatusRecord};
use crate::error::LockError;
use crate::id::{EntryId, ProcessId};
use crate::observer::{LockObserver, TracingObserver};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// How a bounded wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Resolved(Resolution),
    /// The deadline passed and the entry was released on the caller's behalf
    TimedOut,
}

pub struct LockService<C: Clock = SystemClock, O: LockObserver = TracingObserver> {
    manager: Arc<Mutex<LockManager<C, O>>>,
}

impl<C: Clock, O: LockObserver> Clone for LockService<C, O> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
        }
    }
}

impl<C: Clock, O: LockObserver> LockService<C, O> {
    pub fn new(manager: LockManager<C, O>) -> Self {
        Self {
            manager: Arc::new(Mutex::new(manager)),
        }
    }

    fn manager(&self) -> MutexGuard<'_, LockManager<C, O>> {
        self.manager.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn request(
        &self,
        process: &ProcessId,
        lock: &str,
        capacity: u32,
        fail_fast: bool,
    ) -> Result<RequestOutcome, LockError> {
        self.manager()
            .request_lock(process, lock, capacity, fail_fast)
    }

    /// Suspend until the entry is granted or withdrawn
    pub async fn await_grant(&self, entry: EntryId) -> Result<Resolution, LockError> {
        let waiter = self.manager().await_grant(entry)?;
        Ok(waiter.wait().await)
    }

    /// Like [`await_grant`](Self::await_grant), but gives up after `timeout`.
    ///
    /// On expiry the entry is released on the caller's behalf, unless it was
    /// granted in the meantime.
    pub async fn await_grant_timeout(
        &self,
        entry: EntryId,
        timeout: Duration,
    ) -> Result<WaitOutcome, LockError> {
        let waiter = self.manager().await_grant(entry)?;
        match tokio::time::timeout(timeout, waiter.wait()).await {
            Ok(resolution) => Ok(WaitOutcome::Resolved(resolution)),
            Err(_) => {
                let mut manager = self.manager();
                match manager.is_granted(entry) {
                    Some(true) => Ok(WaitOutcome::Resolved(Resolution::Granted)),
                    Some(false) => {
                        manager.release_lock(entry)?;
                        tracing::debug!(%entry, timeout_ms = timeout.as_millis() as u64, "grant wait timed out");
                        Ok(WaitOutcome::TimedOut)
                    }
                    // Released by someone else while we waited
                    None => Ok(WaitOutcome::Resolved(Resolution::Withdrawn)),
                }
            }
        }
    }

    /// Request and wait in one call.
    ///
    /// Returns the granted entry, or `None` if the request was withdrawn
    /// before it was granted.
    pub async fn acquire(
        &self,
        process: &ProcessId,
        lock: &str,
        capacity: u32,
    ) -> Result<Option<EntryId>, LockError> {
        // Subscribe under the same guard so a release cannot slip in between
        let (entry, waiter) = {
            let mut manager = self.manager();
            match manager.request_lock(process, lock, capacity, false)? {
                RequestOutcome::Granted(entry) => return Ok(Some(entry)),
                RequestOutcome::Queued(entry) => (entry, manager.await_grant(entry)?),
                RequestOutcome::WouldBlock => return Ok(None),
            }
        };
        Ok(waiter.wait().await.is_granted().then_some(entry))
    }

    pub fn release(&self, entry: EntryId) -> Result<(), LockError> {
        self.manager().release_lock(entry)
    }

    pub fn status(&self) -> Vec<StatusRecord> {
        self.manager().status()
    }

    pub fn disconnect(&self, process: &ProcessId) -> usize {
        self.manager().disconnect(process)
    }

    /// Run a read-only closure against the manager
    pub fn inspect<R>(&self, f: impl FnOnce(&LockManager<C, O>) -> R) -> R {
        f(&self.manager())
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
