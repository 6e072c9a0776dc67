// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! latch-core: cooperative lock coordinator
//!
//! This crate provides:
//! - Named locks shared by many client processes, granted in strict FIFO order
//! - Per-request capacities, so one lock serves as mutex or N-way semaphore
//! - Deadlock detection at request time instead of waiters hanging forever
//! - An observer seam for diagnostics and a thread-safe service handle

pub mod clock;
pub mod config;
pub mod coordination;
pub mod error;
pub mod event;
pub mod id;
pub mod observer;
pub mod service;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::CoordinatorConfig;
pub use coordination::{
    GrantWaiter, LockManager, RequestOutcome, Resolution, StatusRecord,
};
pub use error::{ErrorKind, LockError};
pub use event::{DetectionStrategy, LockEvent};
pub use id::{EntryId, ProcessId};
pub use observer::{LockObserver, NoOpObserver, TracingObserver};
pub use service::{LockService, WaitOutcome};

#[cfg(any(test, feature = "test-support"))]
pub use observer::RecordingObserver;
