// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cooperative lock coordination
//!
//! This module provides:
//! - **Lock** - Named FIFO queue with running-minimum capacity admission
//! - **QueueEntry** - One process's request, resolved exactly once
//! - **Process** - Entries a client owns and the lock it waits on
//! - **DeadlockDetector** - Chain chase with graph-reduction fallback
//! - **LockManager** - Unified interface for request/await/release/status

pub mod deadlock;
pub mod entry;
pub mod lock;
pub mod manager;
pub mod outcome;
pub mod process;
pub mod status;
pub mod window;

pub use deadlock::{DeadlockDetector, Detection};
pub use entry::QueueEntry;
pub use lock::{Admission, Lock};
pub use manager::{LockManager, RequestOutcome};
pub use outcome::{GrantWaiter, OutcomeSlot, Resolution};
pub use process::Process;
pub use status::StatusRecord;
pub use window::CapacityWindow;
